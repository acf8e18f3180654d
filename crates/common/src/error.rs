//! Error taxonomy shared by every audit stage

use std::fmt;
use thiserror::Error;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditStage {
    ModelLoad,
    Rasterization,
    Layout,
    LogoMatching,
    SemanticCascade,
    Palette,
    Typography,
    BrandVoice,
}

impl fmt::Display for AuditStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditStage::ModelLoad => "model-load",
            AuditStage::Rasterization => "rasterization",
            AuditStage::Layout => "layout",
            AuditStage::LogoMatching => "logo-matching",
            AuditStage::SemanticCascade => "semantic-cascade",
            AuditStage::Palette => "palette",
            AuditStage::Typography => "typography",
            AuditStage::BrandVoice => "brand-voice",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("Document access failed during {stage}: {reason}")]
    DocumentAccess { stage: AuditStage, reason: String },

    #[error("Invalid page index {index} (document has {page_count} pages)")]
    InvalidPage { index: usize, page_count: usize },

    #[error("Region {region} failed: {reason}")]
    RegionProcessing { region: String, reason: String },

    #[error("Missing reference data: {0}")]
    MissingReferenceData(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Image processing error: {0}")]
    Image(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

impl From<image::ImageError> for AuditError {
    fn from(err: image::ImageError) -> Self {
        AuditError::Image(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AuditError {
    fn from(err: serde_yaml::Error) -> Self {
        AuditError::Serialization(err.to_string())
    }
}

/// Coarse error category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ModelLoadFailure,
    DocumentAccessFailure,
    RegionProcessingFailure,
    MissingReferenceData,
}

/// What the orchestrator does with a failed check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    Skip,
    DemoteToWarning,
    AbortPage,
    AbortDocument,
}

impl AuditError {
    pub fn region(region: impl Into<String>, reason: impl fmt::Display) -> Self {
        AuditError::RegionProcessing {
            region: region.into(),
            reason: reason.to_string(),
        }
    }

    pub fn document(stage: AuditStage, reason: impl fmt::Display) -> Self {
        AuditError::DocumentAccess {
            stage,
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuditError::ModelLoad { .. } => ErrorCategory::ModelLoadFailure,
            AuditError::DocumentAccess { .. }
            | AuditError::InvalidPage { .. }
            | AuditError::Io(_)
            | AuditError::Serialization(_)
            | AuditError::Config(_)
            | AuditError::Worker(_) => ErrorCategory::DocumentAccessFailure,
            AuditError::RegionProcessing { .. }
            | AuditError::Inference(_)
            | AuditError::Image(_) => ErrorCategory::RegionProcessingFailure,
            AuditError::MissingReferenceData(_) => ErrorCategory::MissingReferenceData,
        }
    }

    #[must_use]
    pub fn policy(&self) -> ErrorPolicy {
        match self {
            AuditError::ModelLoad { .. }
            | AuditError::DocumentAccess { .. }
            | AuditError::InvalidPage { .. }
            | AuditError::Config(_)
            | AuditError::Io(_)
            | AuditError::Serialization(_)
            | AuditError::Worker(_) => ErrorPolicy::AbortDocument,
            AuditError::Image(_) => ErrorPolicy::AbortPage,
            AuditError::RegionProcessing { .. }
            | AuditError::Inference(_)
            | AuditError::MissingReferenceData(_) => ErrorPolicy::DemoteToWarning,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.policy() == ErrorPolicy::AbortDocument
    }
}

/// Result type for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        let load = AuditError::ModelLoad {
            model: "clip".to_string(),
            reason: "missing file".to_string(),
        };
        assert_eq!(load.category(), ErrorCategory::ModelLoadFailure);
        assert!(load.is_fatal());

        let page = AuditError::InvalidPage {
            index: 4,
            page_count: 2,
        };
        assert_eq!(page.category(), ErrorCategory::DocumentAccessFailure);
        assert_eq!(page.policy(), ErrorPolicy::AbortDocument);

        let region = AuditError::region("figure-3", "encoder returned no rows");
        assert_eq!(region.policy(), ErrorPolicy::DemoteToWarning);
        assert!(!region.is_fatal());

        let missing = AuditError::MissingReferenceData("no fonts".to_string());
        assert_eq!(missing.policy(), ErrorPolicy::DemoteToWarning);
    }

    #[test]
    fn test_document_error_names_stage() {
        let err = AuditError::document(AuditStage::Rasterization, "page 3 unreadable");
        assert_eq!(
            err.to_string(),
            "Document access failed during rasterization: page 3 unreadable"
        );
    }
}
