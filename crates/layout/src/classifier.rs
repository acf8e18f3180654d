//! Page layout classification from native document structure

use crate::document::{NativeBlock, SourceDocument};
use brand_audit_common::{
    AuditError, AuditStage, BBox, LayoutRegion, OcrEngine, PageLayout, RegionContent, RegionType, Result,
};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Font size (pt) above which a text block is a title
    pub title_font_size: f32,
    /// Font size (pt) above which a text block is a section header
    pub section_header_font_size: f32,
    /// Fraction of page height treated as the header band
    pub header_band: f32,
    /// Fraction of page height treated as the footer band
    pub footer_band: f32,
    /// Image blocks with shorter OCR text may be logos
    pub logo_max_text_len: usize,
    /// Image blocks centred above this fraction of page height may be logos
    pub logo_top_fraction: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            title_font_size: 20.0,
            section_header_font_size: 14.0,
            header_band: 0.08,
            footer_band: 0.08,
            logo_max_text_len: 15,
            logo_top_fraction: 0.25,
        }
    }
}

pub struct LayoutClassifier {
    ocr: Arc<dyn OcrEngine>,
    config: LayoutConfig,
}

impl LayoutClassifier {
    #[must_use]
    pub fn new(ocr: Arc<dyn OcrEngine>, config: LayoutConfig) -> Self {
        Self { ocr, config }
    }

    /// Regions of one page in raster pixel coordinates
    pub fn classify(&self, document: &dyn SourceDocument, page_index: usize, raster: &RgbImage) -> Result<PageLayout> {
        let page_count = document.page_count();
        if page_index >= page_count {
            return Err(AuditError::InvalidPage {
                index: page_index,
                page_count,
            });
        }
        let (page_w, page_h) = document.page_size(page_index)?;
        if page_w <= 0.0 || page_h <= 0.0 {
            return Err(AuditError::document(
                AuditStage::Layout,
                format!("page {} has invalid size {page_w}x{page_h}", page_index + 1),
            ));
        }
        let (raster_w, raster_h) = raster.dimensions();
        let sx = raster_w as f32 / page_w;
        let sy = raster_h as f32 / page_h;
        let page_number = page_index + 1;

        let mut regions = Vec::new();
        for block in document.blocks(page_index)? {
            let bbox = block.bbox().scaled(sx, sy).clamp(raster_w as f32, raster_h as f32);
            let Some((x, y, w, h)) = bbox.pixel_rect(raster_w, raster_h) else {
                continue;
            };
            let crop = || image::imageops::crop_imm(raster, x, y, w, h).to_image();

            let (region_type, confidence, content) = match &block {
                NativeBlock::Text { spans, .. } => {
                    let native: String = spans.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
                    let max_size = spans.iter().map(|s| s.size).fold(0.0f32, f32::max);
                    let (text, confidence) = if native.trim().is_empty() {
                        self.ocr_block(&crop(), page_number, regions.len())
                    } else {
                        (native.trim().to_string(), 1.0)
                    };
                    let region_type = self.classify_text(max_size, &bbox, raster_h as f32);
                    (region_type, confidence, RegionContent::Text(text))
                }
                NativeBlock::Image { .. } => {
                    let image = crop();
                    let (text, _) = self.ocr_block(&image, page_number, regions.len());
                    let (center_y, top) = (bbox.center().1, self.config.logo_top_fraction * raster_h as f32);
                    if text.chars().count() < self.config.logo_max_text_len && center_y < top {
                        (RegionType::Logo, 0.5, RegionContent::Image(image))
                    } else {
                        (RegionType::Figure, 1.0, RegionContent::Image(image))
                    }
                }
            };

            debug!("Page {} region {}: {:?} at {:?}", page_number, regions.len(), region_type, bbox);
            regions.push(LayoutRegion {
                id: regions.len(),
                region_type,
                bbox,
                confidence,
                content,
                page_number,
            });
        }

        Ok(PageLayout {
            page_number,
            page_size: (raster_w, raster_h),
            regions,
        })
    }

    fn classify_text(&self, max_font_size: f32, bbox: &BBox, page_height: f32) -> RegionType {
        if max_font_size > self.config.title_font_size {
            RegionType::Title
        } else if max_font_size > self.config.section_header_font_size {
            RegionType::SectionHeader
        } else if bbox.y1 <= self.config.header_band * page_height {
            RegionType::Header
        } else if bbox.y0 >= (1.0 - self.config.footer_band) * page_height {
            RegionType::Footer
        } else {
            RegionType::Text
        }
    }

    /// OCR limited to one block; failures leave the text empty
    fn ocr_block(&self, crop: &RgbImage, page_number: usize, region: usize) -> (String, f32) {
        match self.ocr.recognize_words(crop) {
            Ok(words) if !words.is_empty() => {
                let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32 / 100.0;
                let text = words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
                (text, confidence.clamp(0.0, 1.0))
            }
            Ok(_) => (String::new(), 0.0),
            Err(e) => {
                warn!("OCR failed on page {} region {}: {}", page_number, region, e);
                (String::new(), 0.0)
            }
        }
    }
}
