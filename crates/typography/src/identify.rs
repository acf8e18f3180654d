//! Block-level font identification by per-character voting

use crate::embeddings::FontLibrary;
use crate::encoder::GlyphEncoder;
use crate::renderer::GLYPH_SIZE;
use brand_audit_common::{cosine_similarity, AuditError, BBox, OcrEngine, Result};
use image::imageops::FilterType;
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyConfig {
    /// A character votes for its best font only at or above this cosine similarity
    pub min_similarity: f32,
    /// Winning share of characters needed to call the font known
    pub min_confidence: f32,
    /// Fractional padding around each OCR symbol box
    pub crop_padding: f32,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.55,
            min_confidence: 0.5,
            crop_padding: 0.15,
        }
    }
}

/// A single character cropped from the page, 64x64 grayscale
#[derive(Debug, Clone)]
pub struct CharacterGlyph {
    pub ch: char,
    pub image: GrayImage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FontDetection {
    Known {
        family: String,
        /// Winning votes over all characters in the block
        confidence: f32,
    },
    Unknown {
        confidence: f32,
    },
}

impl FontDetection {
    #[must_use]
    pub fn confidence(&self) -> f32 {
        match self {
            Self::Known { confidence, .. } | Self::Unknown { confidence } => *confidence,
        }
    }
}

pub struct FontIdentifier<'a> {
    library: &'a FontLibrary,
    encoder: &'a dyn GlyphEncoder,
    config: IdentifyConfig,
}

impl<'a> FontIdentifier<'a> {
    pub fn new(library: &'a FontLibrary, encoder: &'a dyn GlyphEncoder, config: IdentifyConfig) -> Self {
        Self {
            library,
            encoder,
            config,
        }
    }

    /// Vote over the block's characters
    ///
    /// Each glyph is encoded as cropped and inverted in a single batch so that
    /// light-on-dark text compares against dark-on-white references.
    pub fn identify(&self, glyphs: &[CharacterGlyph]) -> Result<FontDetection> {
        if glyphs.is_empty() || self.library.is_empty() {
            return Ok(FontDetection::Unknown { confidence: 0.0 });
        }

        let mut batch: Vec<GrayImage> = glyphs.iter().map(|g| g.image.clone()).collect();
        batch.extend(glyphs.iter().map(|g| {
            let mut inverted = g.image.clone();
            image::imageops::invert(&mut inverted);
            inverted
        }));
        let embeddings = self.encoder.encode(&batch)?;
        if embeddings.len() != batch.len() {
            return Err(AuditError::Inference(format!(
                "glyph encoder returned {} embeddings for {} glyphs",
                embeddings.len(),
                batch.len()
            )));
        }
        let (normal, inverted) = embeddings.split_at(glyphs.len());

        let mut votes: HashMap<&str, usize> = HashMap::new();
        for (i, glyph) in glyphs.iter().enumerate() {
            let best = self
                .library
                .fonts
                .iter()
                .filter_map(|font| {
                    let reference = font.get(glyph.ch)?;
                    let score = cosine_similarity(&normal[i], reference).max(cosine_similarity(&inverted[i], reference));
                    Some((font.font_family.as_str(), score))
                })
                .max_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((family, score)) = best {
                if score >= self.config.min_similarity {
                    *votes.entry(family).or_default() += 1;
                }
            }
        }

        // Ties go to the font listed first in the library
        let winner = self
            .library
            .families()
            .filter_map(|family| votes.get(family).map(|&v| (family, v)))
            .fold(None::<(&str, usize)>, |acc, (family, v)| match acc {
                Some((_, best)) if best >= v => acc,
                _ => Some((family, v)),
            });

        let total = glyphs.len() as f32;
        let detection = match winner {
            Some((family, v)) if v as f32 / total >= self.config.min_confidence => FontDetection::Known {
                family: family.to_string(),
                confidence: v as f32 / total,
            },
            Some((_, v)) => FontDetection::Unknown {
                confidence: v as f32 / total,
            },
            None => FontDetection::Unknown { confidence: 0.0 },
        };
        debug!("Font vote over {} characters: {:?}", glyphs.len(), detection);
        Ok(detection)
    }
}

/// Crop every OCR symbol inside `block` as a 64x64 grayscale glyph
pub fn extract_glyphs(page: &RgbImage, block: &BBox, ocr: &dyn OcrEngine, padding: f32) -> Result<Vec<CharacterGlyph>> {
    let (page_w, page_h) = page.dimensions();
    let Some((bx, by, bw, bh)) = block.pixel_rect(page_w, page_h) else {
        return Ok(Vec::new());
    };
    let crop = image::imageops::crop_imm(page, bx, by, bw, bh).to_image();
    let gray = image::imageops::grayscale(&crop);

    let symbols = ocr
        .recognize_symbols(&crop)
        .map_err(|e| AuditError::region(format!("text block {block:?}"), e.to_string()))?;

    let glyphs = symbols
        .into_iter()
        .filter_map(|symbol| {
            let ch = symbol.text.trim().chars().next()?;
            let (x, y, w, h) = symbol.bbox.padded(padding).pixel_rect(bw, bh)?;
            let glyph = image::imageops::crop_imm(&gray, x, y, w, h).to_image();
            Some(CharacterGlyph {
                ch,
                image: image::imageops::resize(&glyph, GLYPH_SIZE, GLYPH_SIZE, FilterType::Triangle),
            })
        })
        .collect();
    Ok(glyphs)
}
