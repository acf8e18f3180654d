//! Per-page and per-document results

use brand_audit_common::{InspectionResult, Level, Status};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based
    pub page_number: usize,
    pub width: u32,
    pub height: u32,
    /// Page-relative coordinates, ordered logo, imagery, background, text color, typography, brand voice
    pub results: Vec<InspectionResult>,
    /// Set when the page was abandoned after a page-level failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    ActionRequired,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentScore {
    /// 0-100
    pub score: u32,
    pub status: ComplianceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub brand_kit: String,
    pub pages: Vec<PageReport>,
    /// Document-wide findings such as missing reference data
    pub warnings: Vec<InspectionResult>,
    pub summary: DocumentScore,
}

impl DocumentReport {
    pub fn new(brand_kit: impl Into<String>, pages: Vec<PageReport>, warnings: Vec<InspectionResult>) -> Self {
        let summary = score_document(warnings.iter().chain(pages.iter().flat_map(|p| p.results.iter())));
        Self {
            brand_kit: brand_kit.into(),
            pages,
            warnings,
            summary,
        }
    }

    pub fn results(&self) -> impl Iterator<Item = &InspectionResult> {
        self.pages.iter().flat_map(|p| p.results.iter())
    }
}

/// Weighted deduction from 100: CRITICAL -15, MEDIUM -5, WARNING -1
pub fn score_document<'a>(results: impl IntoIterator<Item = &'a InspectionResult>) -> DocumentScore {
    let mut deduction = 0u32;
    let mut critical = false;
    let mut failed = false;
    for result in results {
        deduction += match result.level {
            Level::Critical => 15,
            Level::Medium => 5,
            Level::Warning => 1,
            Level::Pass | Level::Info => 0,
        };
        critical |= result.level == Level::Critical;
        failed |= result.status == Status::Fail;
    }
    let status = if critical {
        ComplianceStatus::Critical
    } else if failed {
        ComplianceStatus::ActionRequired
    } else {
        ComplianceStatus::Compliant
    };
    DocumentScore {
        score: 100u32.saturating_sub(deduction),
        status,
    }
}
