//! `audit`: run a full document audit and emit the JSON report

use anyhow::{Context as _, Result};
use brand_audit_common::BrandKit;
use brand_audit_layout::{ImageFilePages, ManifestDocument};
use brand_audit_orchestrator::{AuditConfig, AuditService, ModelConfig, ModelHost};
use brand_audit_typography::GlyphEmbeddingStore;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct AuditCommand {
    /// Brand kit (YAML or JSON)
    #[arg(long)]
    kit: PathBuf,

    /// Document structure manifest (JSON)
    #[arg(long)]
    manifest: PathBuf,

    /// Rendered page images, in page order
    #[arg(long, num_args = 1.., required = true)]
    pages: Vec<PathBuf>,

    /// Glyph embedding store directory
    #[arg(long)]
    store: PathBuf,

    /// Model configuration (YAML)
    #[arg(long)]
    models: PathBuf,

    /// Audit thresholds (YAML); defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl AuditCommand {
    pub async fn execute(self) -> Result<()> {
        let kit = BrandKit::from_path(&self.kit)
            .with_context(|| format!("Failed to load brand kit {}", self.kit.display()))?;
        let config = match &self.config {
            Some(path) => AuditConfig::from_path(path)
                .with_context(|| format!("Failed to load audit config {}", path.display()))?,
            None => AuditConfig::default(),
        };
        let models = ModelConfig::from_path(&self.models)
            .with_context(|| format!("Failed to load model config {}", self.models.display()))?;
        let document = ManifestDocument::from_path(&self.manifest)
            .with_context(|| format!("Failed to load manifest {}", self.manifest.display()))?;

        let host = tokio::task::spawn_blocking(move || ModelHost::get_instance(&models))
            .await
            .context("Model loading task failed")??;
        let service = AuditService::new(host, config, GlyphEmbeddingStore::new(&self.store));

        let report = service
            .audit(kit, Arc::new(document), Arc::new(ImageFilePages::new(self.pages.clone())))
            .await?;
        info!(
            "{} pages audited, score {} ({:?})",
            report.pages.len(),
            report.summary.score,
            report.summary.status
        );

        let json = serde_json::to_string_pretty(&report)?;
        match &self.output {
            Some(path) => {
                std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Report written to {}", path.display());
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}
