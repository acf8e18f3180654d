//! Reference glyph rendering

use ab_glyph::{point, Font, FontVec, PxScale};
use brand_audit_common::{AuditError, Result};
use image::imageops::FilterType;
use image::{GrayImage, Luma};
use std::path::Path;

/// Side of the square glyph images fed to the encoder
pub const GLYPH_SIZE: u32 = 64;

pub const DEFAULT_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Renders characters of one font as dark-on-white 64x64 glyphs
pub struct FontRenderer {
    font: FontVec,
    family: String,
    pixel_size: f32,
    padding: u32,
}

impl FontRenderer {
    pub fn from_bytes(family: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let family = family.into();
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| AuditError::MissingReferenceData(format!("font '{family}' is not a valid TTF/OTF: {e}")))?;
        Ok(Self {
            font,
            family,
            pixel_size: 96.0,
            padding: 5,
        })
    }

    pub fn from_file(family: impl Into<String>, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(family, bytes)
    }

    #[must_use]
    pub fn with_pixel_size(mut self, pixel_size: f32) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Tight glyph box plus padding, resized to 64x64; `None` if the font lacks the glyph
    #[must_use]
    pub fn render(&self, ch: char) -> Option<GrayImage> {
        let id = self.font.glyph_id(ch);
        if id.0 == 0 {
            return None;
        }
        let glyph = id.with_scale_and_position(PxScale::from(self.pixel_size), point(0.0, 0.0));
        let outlined = self.font.outline_glyph(glyph)?;
        let bounds = outlined.px_bounds();
        let w = bounds.width().ceil() as u32 + 2 * self.padding;
        let h = bounds.height().ceil() as u32 + 2 * self.padding;

        let mut canvas = GrayImage::from_pixel(w, h, Luma([255]));
        let pad = self.padding;
        outlined.draw(|x, y, coverage| {
            let (px, py) = (x + pad, y + pad);
            if px < w && py < h {
                let ink = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                canvas.put_pixel(px, py, Luma([255 - ink]));
            }
        });
        Some(image::imageops::resize(&canvas, GLYPH_SIZE, GLYPH_SIZE, FilterType::Triangle))
    }

    /// Rendered glyphs for every supported character of `charset`
    #[must_use]
    pub fn render_charset(&self, charset: &str) -> Vec<(char, GrayImage)> {
        charset.chars().filter_map(|ch| self.render(ch).map(|img| (ch, img))).collect()
    }
}
