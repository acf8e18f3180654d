//! Audit orchestration
//!
//! - [`ModelHost`]: shared, load-once inference resources
//! - [`AuditSession`]: brand-kit-specific reference data for one audit
//! - [`BatchOrchestrator`]: chunked page processing and result assembly
//! - [`AuditService`]: async front end bounding concurrent audits

pub mod batch;
pub mod config;
pub mod host;
pub mod report;
pub mod service;
pub mod session;
pub mod voice;

pub use batch::BatchOrchestrator;
pub use config::{AuditConfig, ModelConfig};
pub use host::{ModelCell, ModelHost};
pub use report::{score_document, ComplianceStatus, DocumentReport, DocumentScore, PageReport};
pub use service::AuditService;
pub use session::AuditSession;
pub use voice::{BrandVoiceChecker, BrandVoiceConfig};

#[cfg(test)]
pub(crate) mod testing;
