//! Brand compliance auditing for rendered document pages.
//!
//! Re-exports the workspace crates so downstream users can depend on a single
//! package. See `brand_audit_orchestrator` for the entry points.

pub use brand_audit_common as common;
pub use brand_audit_embeddings as embeddings;
pub use brand_audit_layout as layout;
pub use brand_audit_logo_detection as logo_detection;
pub use brand_audit_ocr as ocr;
pub use brand_audit_orchestrator as orchestrator;
pub use brand_audit_palette as palette;
pub use brand_audit_typography as typography;

pub use brand_audit_common::{AuditError, BrandKit, InspectionResult, Result};
pub use brand_audit_orchestrator::{
    AuditService, BatchOrchestrator, DocumentReport, ModelHost, PageReport,
};
