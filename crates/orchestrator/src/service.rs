//! Async entry point with bounded document concurrency

use crate::batch::BatchOrchestrator;
use crate::config::AuditConfig;
use crate::host::ModelHost;
use crate::report::DocumentReport;
use crate::session::AuditSession;
use brand_audit_common::{AuditError, BrandKit, Result};
use brand_audit_layout::{PageRasterizer, SourceDocument};
use brand_audit_typography::GlyphEmbeddingStore;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Runs whole-document audits on the blocking thread pool
///
/// At most `max_concurrent_audits` documents are audited at once; further
/// requests wait for a permit.
#[derive(Clone)]
pub struct AuditService {
    orchestrator: Arc<BatchOrchestrator>,
    config: Arc<AuditConfig>,
    store: GlyphEmbeddingStore,
    permits: Arc<Semaphore>,
}

impl AuditService {
    pub fn new(host: Arc<ModelHost>, config: AuditConfig, store: GlyphEmbeddingStore) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_audits.max(1)));
        Self {
            orchestrator: Arc::new(BatchOrchestrator::new(host, &config)),
            config: Arc::new(config),
            store,
            permits,
        }
    }

    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn audit(
        &self,
        kit: BrandKit,
        document: Arc<dyn SourceDocument>,
        pages: Arc<dyn PageRasterizer>,
    ) -> Result<DocumentReport> {
        debug!("Audit of '{}' waiting for a permit", kit.id);
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| AuditError::Worker(e.to_string()))?;
        info!("Audit of '{}' started", kit.id);

        let orchestrator = Arc::clone(&self.orchestrator);
        let config = Arc::clone(&self.config);
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            kit.validate()?;
            let fonts = store.load_all(&kit.id)?;
            let session = AuditSession::prepare(orchestrator.host(), kit, fonts, &config)?;
            orchestrator.audit_document(&session, document.as_ref(), pages.as_ref())
        })
        .await
        .map_err(|e| AuditError::Worker(format!("audit task failed: {e}")))?
    }
}
