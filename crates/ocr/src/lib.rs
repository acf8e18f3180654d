//! OCR using Tesseract 5.x
//!
//! [`TesseractOcr`] implements the [`OcrEngine`] interface with word- and
//! symbol-level boxes in image pixel coordinates. [`blocks`] groups words
//! into lines and text blocks.

pub mod blocks;

pub use blocks::{group_blocks, group_lines, TextBlock, TextLine};

use brand_audit_common::{AuditError, BBox, OcrEngine, OcrWord, Result};
use image::RgbImage;
use leptess::{capi, LepTess, Variable};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language codes (e.g., "eng", "eng+fra")
    pub language: String,
    /// Directory containing `tessdata`, system default when unset
    #[serde(default)]
    pub data_path: Option<String>,
    /// Minimum word confidence (0-100)
    pub min_confidence: i32,
    /// Minimum single-glyph confidence (0-100)
    #[serde(default = "default_symbol_min_confidence")]
    pub symbol_min_confidence: i32,
    /// Page segmentation mode (see Tesseract PSM)
    pub page_segmentation_mode: u32,
}

fn default_symbol_min_confidence() -> i32 {
    20
}

/// PSM_SINGLE_CHAR, used when re-reading one symbol box
const SINGLE_CHAR_PSM: u32 = 10;

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            data_path: None,
            min_confidence: 50,
            symbol_min_confidence: default_symbol_min_confidence(),
            page_segmentation_mode: 3, // PSM_AUTO
        }
    }
}

/// Tesseract engine; a fresh `LepTess` handle is created per call
pub struct TesseractOcr {
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Result<Self> {
        // Fail at load time when the language data is missing
        LepTess::new(config.data_path.as_deref(), &config.language).map_err(|e| AuditError::ModelLoad {
            model: "tesseract".to_string(),
            reason: format!("language '{}': {e}", config.language),
        })?;
        Ok(Self { config })
    }

    fn open(&self, image: &RgbImage) -> Result<LepTess> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(AuditError::Image(format!(
                "Image dimensions must be non-zero (got {width}x{height})"
            )));
        }

        let mut lt = LepTess::new(self.config.data_path.as_deref(), &self.config.language)
            .map_err(|e| AuditError::Inference(format!("Failed to initialize Tesseract: {e}")))?;
        set_psm(&mut lt, self.config.page_segmentation_mode)?;

        // leptess expects encoded image data
        let mut png_buf = std::io::Cursor::new(Vec::new());
        image.write_to(&mut png_buf, image::ImageFormat::Png)?;
        lt.set_image_from_mem(png_buf.get_ref())
            .map_err(|e| AuditError::Inference(format!("Failed to set image from memory: {e}")))?;
        Ok(lt)
    }

    /// Layout analysis finds the boxes at `level`; each box is then read on
    /// its own, as a single character for symbols
    fn recognize_level(&self, image: &RgbImage, level: capi::TessPageIteratorLevel) -> Result<Vec<OcrWord>> {
        let mut lt = self.open(image)?;

        // None means nothing was detected, e.g. a blank image
        let Some(boxes) = lt.get_component_boxes(level, true) else {
            return Ok(Vec::new());
        };

        let symbols = level == capi::TessPageIteratorLevel_RIL_SYMBOL;
        let min_confidence = if symbols {
            set_psm(&mut lt, SINGLE_CHAR_PSM)?;
            self.config.symbol_min_confidence
        } else {
            self.config.min_confidence
        };

        let mut words = Vec::new();
        for component in &boxes {
            let geom = component.get_geometry();
            lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);
            let text = lt.get_utf8_text().unwrap_or_default().trim().to_string();
            if text.is_empty() {
                continue;
            }
            if symbols && text.chars().count() != 1 {
                debug!("Skipping symbol box read as '{}'", text);
                continue;
            }
            let confidence = lt.mean_text_conf();
            if confidence < min_confidence {
                continue;
            }
            debug!(
                "OCR found '{}' ({}%) at ({}, {}, {}x{})",
                text, confidence, geom.x, geom.y, geom.w, geom.h
            );
            words.push(OcrWord {
                text,
                bbox: BBox::from_xywh(geom.x as f32, geom.y as f32, geom.w as f32, geom.h as f32),
                confidence: confidence as f32,
            });
        }
        Ok(words)
    }
}

fn set_psm(lt: &mut LepTess, mode: u32) -> Result<()> {
    lt.set_variable(Variable::TesseditPagesegMode, &mode.to_string())
        .map_err(|e| AuditError::Inference(format!("Failed to set PSM {mode}: {e}")))
}

impl OcrEngine for TesseractOcr {
    fn recognize_words(&self, image: &RgbImage) -> Result<Vec<OcrWord>> {
        self.recognize_level(image, capi::TessPageIteratorLevel_RIL_WORD)
    }

    fn recognize_symbols(&self, image: &RgbImage) -> Result<Vec<OcrWord>> {
        self.recognize_level(image, capi::TessPageIteratorLevel_RIL_SYMBOL)
    }
}
