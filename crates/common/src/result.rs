//! Findings produced by the auditors

use crate::BBox;
use serde::{Deserialize, Serialize};

/// What a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    Logo,
    Imagery,
    BackgroundColor,
    TextColor,
    Typography,
    BrandVoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Warning,
}

/// Severity attached to a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Pass,
    Medium,
    Critical,
    Warning,
    Info,
}

/// One auditor finding for a page region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionResult {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub bbox: BBox,
    pub status: Status,
    pub level: Level,
    /// Human-readable message
    pub metric: String,
    /// Matched logo variant or detected font family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl InspectionResult {
    #[must_use]
    pub fn new(kind: FindingKind, bbox: BBox, status: Status, level: Level, metric: impl Into<String>) -> Self {
        Self {
            kind,
            bbox,
            status,
            level,
            metric: metric.into(),
            variant: None,
        }
    }

    #[must_use]
    pub fn pass(kind: FindingKind, bbox: BBox, metric: impl Into<String>) -> Self {
        Self::new(kind, bbox, Status::Pass, Level::Pass, metric)
    }

    #[must_use]
    pub fn fail(kind: FindingKind, bbox: BBox, level: Level, metric: impl Into<String>) -> Self {
        Self::new(kind, bbox, Status::Fail, level, metric)
    }

    #[must_use]
    pub fn warning(kind: FindingKind, bbox: BBox, metric: impl Into<String>) -> Self {
        Self::new(kind, bbox, Status::Warning, Level::Warning, metric)
    }

    /// Non-violating informational finding
    #[must_use]
    pub fn info(kind: FindingKind, bbox: BBox, metric: impl Into<String>) -> Self {
        Self::new(kind, bbox, Status::Pass, Level::Info, metric)
    }

    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Copy with the bbox clipped to the page and divided by its size
    #[must_use]
    pub fn normalized(&self, page_width: f32, page_height: f32) -> Self {
        Self {
            bbox: self.bbox.normalized(page_width, page_height),
            ..self.clone()
        }
    }
}
