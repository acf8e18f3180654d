//! Shared inference resources
//!
//! [`ModelHost`] bundles every heavyweight model behind the narrow model
//! traits. It is built once, never mutated, and handed to components as an
//! `Arc`. [`ModelCell`] performs the one-time construction; a failed load is
//! remembered so later callers see the same error instead of a second attempt.

use crate::config::ModelConfig;
use brand_audit_common::{AuditError, ImageTextEncoder, KeypointExtractor, OcrEngine, Result, ZeroShotClassifier};
use brand_audit_embeddings::{ClipEncoder, ZeroShotNli};
use brand_audit_logo_detection::FastGradientExtractor;
use brand_audit_ocr::TesseractOcr;
use brand_audit_typography::{GlyphEncoder, SiameseEncoder};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub struct ModelHost {
    keypoints: Arc<dyn KeypointExtractor>,
    vision: Arc<dyn ImageTextEncoder>,
    text_classifier: Arc<dyn ZeroShotClassifier>,
    ocr: Arc<dyn OcrEngine>,
    glyph_encoder: Arc<dyn GlyphEncoder>,
}

impl ModelHost {
    pub fn from_parts(
        keypoints: Arc<dyn KeypointExtractor>,
        vision: Arc<dyn ImageTextEncoder>,
        text_classifier: Arc<dyn ZeroShotClassifier>,
        ocr: Arc<dyn OcrEngine>,
        glyph_encoder: Arc<dyn GlyphEncoder>,
    ) -> Self {
        Self {
            keypoints,
            vision,
            text_classifier,
            ocr,
            glyph_encoder,
        }
    }

    /// Load every model; any failure is a `ModelLoad` error
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Loading model host");

        let vision = ClipEncoder::load(config.clip.clone())?;
        let text_classifier = ZeroShotNli::load(config.nli.clone())?;
        let ocr = TesseractOcr::new(config.ocr.clone())?;
        let glyph_encoder = SiameseEncoder::load(&config.glyph_encoder)?;
        let keypoints = FastGradientExtractor::new(config.keypoints.clone());

        info!("Model host ready in {:.2}s", start.elapsed().as_secs_f64());
        Ok(Self::from_parts(
            Arc::new(keypoints),
            Arc::new(vision),
            Arc::new(text_classifier),
            Arc::new(ocr),
            Arc::new(glyph_encoder),
        ))
    }

    /// Process-wide instance, loaded from `config` on first call
    ///
    /// Later calls return the same instance and ignore `config`.
    pub fn get_instance(config: &ModelConfig) -> Result<Arc<ModelHost>> {
        static INSTANCE: ModelCell = ModelCell::new();
        INSTANCE.get_or_load(|| ModelHost::load(config))
    }

    #[must_use]
    pub fn keypoints(&self) -> &dyn KeypointExtractor {
        self.keypoints.as_ref()
    }

    #[must_use]
    pub fn vision(&self) -> &dyn ImageTextEncoder {
        self.vision.as_ref()
    }

    #[must_use]
    pub fn text_classifier(&self) -> &dyn ZeroShotClassifier {
        self.text_classifier.as_ref()
    }

    #[must_use]
    pub fn ocr(&self) -> &dyn OcrEngine {
        self.ocr.as_ref()
    }

    /// Shared handle, for components that keep the engine
    #[must_use]
    pub fn ocr_handle(&self) -> Arc<dyn OcrEngine> {
        Arc::clone(&self.ocr)
    }

    #[must_use]
    pub fn glyph_encoder(&self) -> &dyn GlyphEncoder {
        self.glyph_encoder.as_ref()
    }
}

/// Once-only, thread-safe holder of a [`ModelHost`]
pub struct ModelCell {
    cell: OnceCell<std::result::Result<Arc<ModelHost>, String>>,
}

impl ModelCell {
    #[must_use]
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// Run `load` exactly once across all threads
    ///
    /// Concurrent callers block until the first load finishes and then observe
    /// its outcome.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<ModelHost>>
    where
        F: FnOnce() -> Result<ModelHost>,
    {
        let outcome = self.cell.get_or_init(|| match load() {
            Ok(host) => Ok(Arc::new(host)),
            Err(e) => {
                error!("Model host failed to load: {e}");
                Err(e.to_string())
            }
        });
        match outcome {
            Ok(host) => Ok(Arc::clone(host)),
            Err(reason) => Err(AuditError::ModelLoad {
                model: "model-host".to_string(),
                reason: reason.clone(),
            }),
        }
    }

    /// The host, only once it loaded successfully
    #[must_use]
    pub fn get(&self) -> Option<Arc<ModelHost>> {
        match self.cell.get() {
            Some(Ok(host)) => Some(Arc::clone(host)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }
}

impl Default for ModelCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_host, AxisEncoder, FlatClassifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_single_load_under_contention() {
        let cell = Arc::new(ModelCell::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let loads = Arc::clone(&loads);
                std::thread::spawn(move || {
                    cell.get_or_load(|| {
                        loads.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        Ok(fake_host(Arc::new(AxisEncoder::default()), Arc::new(FlatClassifier::new(0.9))))
                    })
                    .unwrap()
                })
            })
            .collect();

        let hosts: Vec<Arc<ModelHost>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(hosts.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(cell.is_ready());
    }

    #[test]
    fn test_failed_load_is_remembered() {
        let cell = ModelCell::new();
        let attempts = AtomicUsize::new(0);
        let failing = || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::ModelLoad {
                model: "clip".to_string(),
                reason: "missing weights".to_string(),
            })
        };

        let first = cell.get_or_load(failing).err().unwrap();
        assert!(first.to_string().contains("missing weights"));
        let second = cell
            .get_or_load(|| Ok(fake_host(Arc::new(AxisEncoder::default()), Arc::new(FlatClassifier::new(0.9)))))
            .err()
            .unwrap();
        assert!(matches!(second, AuditError::ModelLoad { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(!cell.is_ready());
        assert!(cell.get().is_none());
    }
}
