//! Common types for brand compliance auditing

pub mod brand_kit;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod models;
pub mod result;

pub use brand_kit::{
    parse_hex, BrandColor, BrandKit, BrandVoice, LogoAsset, LogoGuidelines, LogoRule, TypographyRule,
};
pub use error::{AuditError, AuditStage, ErrorCategory, ErrorPolicy, Result};
pub use geometry::BBox;
pub use layout::{LayoutRegion, PageLayout, RegionContent, RegionType};
pub use models::{
    ImageTextEncoder, Keypoint, KeypointExtractor, KeypointSet, OcrEngine, OcrWord, ZeroShotClassifier,
};
pub use result::{FindingKind, InspectionResult, Level, Status};

/// Cosine similarity, zero when either vector has no magnitude
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Scale to unit L2 norm in place
pub fn normalize_vector(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}
