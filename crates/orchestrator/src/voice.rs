//! Brand-voice check over the page's running text

use brand_audit_common::{BBox, BrandVoice, FindingKind, InspectionResult, Level};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandVoiceConfig {
    /// Best attribute score below which the page is off-voice
    pub min_attribute_score: f32,
    /// Text beyond this many characters is not sent to the classifier
    pub max_chars: usize,
}

impl Default for BrandVoiceConfig {
    fn default() -> Self {
        Self {
            min_attribute_score: 0.5,
            max_chars: 2000,
        }
    }
}

pub struct BrandVoiceChecker {
    attributes: Vec<String>,
    /// Lowercased
    forbidden: Vec<String>,
    config: BrandVoiceConfig,
}

impl BrandVoiceChecker {
    pub fn new(voice: &BrandVoice, config: BrandVoiceConfig) -> Self {
        Self {
            attributes: voice.attributes.iter().filter(|a| !a.trim().is_empty()).cloned().collect(),
            forbidden: voice
                .forbidden_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            config,
        }
    }

    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Text as sent to the classifier
    #[must_use]
    pub fn classifier_input(&self, text: &str) -> String {
        text.chars().take(self.config.max_chars).collect()
    }

    /// Forbidden keywords present in `text` as whole words, in configuration order
    #[must_use]
    pub fn forbidden_hits(&self, text: &str) -> Vec<&str> {
        let text = text.to_lowercase();
        self.forbidden
            .iter()
            .filter(|k| contains_word(&text, k))
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn keyword_finding(&self, text: &str, bbox: BBox) -> Option<InspectionResult> {
        let hits = self.forbidden_hits(text);
        if hits.is_empty() {
            return None;
        }
        Some(InspectionResult::fail(
            FindingKind::BrandVoice,
            bbox,
            Level::Medium,
            format!("forbidden keywords: {}", hits.join(", ")),
        ))
    }

    /// Verdict from one row of classifier scores aligned with [`Self::attributes`]
    #[must_use]
    pub fn attribute_finding(&self, scores: &[f32], bbox: BBox) -> Option<InspectionResult> {
        let (best, score) = self
            .attributes
            .iter()
            .zip(scores)
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        let result = if *score < self.config.min_attribute_score {
            InspectionResult::warning(
                FindingKind::BrandVoice,
                bbox,
                format!("text does not reflect brand voice (best: {best} {score:.2})"),
            )
        } else {
            InspectionResult::pass(FindingKind::BrandVoice, bbox, format!("{best} {score:.2}"))
        };
        Some(result.with_variant(best.clone()))
    }
}

/// Whole-word occurrence of `needle` in `haystack`, both already lowercased
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
