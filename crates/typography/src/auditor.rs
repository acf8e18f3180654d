//! Typography compliance per text block

use crate::blocks::{classify_blocks, BlockKind};
use crate::embeddings::FontLibrary;
use crate::encoder::GlyphEncoder;
use crate::identify::{extract_glyphs, FontDetection, FontIdentifier, IdentifyConfig};
use brand_audit_common::{BBox, BrandKit, FindingKind, InspectionResult, Level, OcrEngine, OcrWord, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypographyConfig {
    /// Block is a HEADER when its average word height exceeds this multiple of the page median
    pub header_ratio: f32,
    #[serde(flatten)]
    pub identify: IdentifyConfig,
}

impl Default for TypographyConfig {
    fn default() -> Self {
        Self {
            header_ratio: 1.3,
            identify: IdentifyConfig::default(),
        }
    }
}

pub struct TypographyAuditor {
    library: FontLibrary,
    config: TypographyConfig,
}

impl TypographyAuditor {
    pub fn new(library: FontLibrary, config: TypographyConfig) -> Self {
        Self { library, config }
    }

    #[must_use]
    pub fn library(&self) -> &FontLibrary {
        &self.library
    }

    /// Findings for every text block on the page
    ///
    /// Per-block failures come back as `Err` entries so the caller can apply
    /// its error policy without losing the other blocks. Unknown body text
    /// produces no finding.
    pub fn audit_page(
        &self,
        page: &RgbImage,
        words: &[OcrWord],
        kit: &BrandKit,
        ocr: &dyn OcrEngine,
        encoder: &dyn GlyphEncoder,
    ) -> Vec<Result<InspectionResult>> {
        let blocks = classify_blocks(words, self.config.header_ratio);
        if blocks.is_empty() {
            return Vec::new();
        }
        if self.library.is_empty() {
            let (w, h) = page.dimensions();
            return vec![Ok(InspectionResult::warning(
                FindingKind::Typography,
                BBox::new(0.0, 0.0, w as f32, h as f32),
                format!("no reference fonts ingested for brand kit '{}'", kit.id),
            ))];
        }

        let identifier = FontIdentifier::new(&self.library, encoder, self.config.identify.clone());
        let mut results = Vec::new();
        for classified in blocks {
            let bbox = classified.block.bbox;
            let detection = extract_glyphs(page, &bbox, ocr, self.config.identify.crop_padding)
                .and_then(|glyphs| identifier.identify(&glyphs));
            match detection {
                Ok(detection) => {
                    debug!("{:?} block at {:?}: {:?}", classified.kind, bbox, detection);
                    if let Some(result) = block_finding(&detection, classified.kind, bbox, kit) {
                        results.push(Ok(result));
                    }
                }
                Err(e) => results.push(Err(e)),
            }
        }
        results
    }
}

/// Map a detection to its finding, `None` for unknown body text
#[must_use]
pub fn block_finding(detection: &FontDetection, kind: BlockKind, bbox: BBox, kit: &BrandKit) -> Option<InspectionResult> {
    match detection {
        FontDetection::Known { family, confidence } if kit.is_allowed_font(family) => Some(
            InspectionResult::pass(
                FindingKind::Typography,
                bbox,
                format!("{family} ({:.0}% of characters)", confidence * 100.0),
            )
            .with_variant(family.clone()),
        ),
        FontDetection::Known { family, confidence } => Some(
            InspectionResult::fail(
                FindingKind::Typography,
                bbox,
                Level::Medium,
                format!(
                    "font {family} is not a brand typeface ({:.0}% of characters)",
                    confidence * 100.0
                ),
            )
            .with_variant(family.clone()),
        ),
        FontDetection::Unknown { confidence } => match kind {
            BlockKind::Header => Some(InspectionResult::warning(
                FindingKind::Typography,
                bbox,
                format!("unidentified header font (confidence {confidence:.2})"),
            )),
            BlockKind::Body => None,
        },
    }
}
