//! Shared fixtures: deterministic model stand-ins and synthetic pages

#![allow(dead_code)]

use brand_audit::common::{
    normalize_vector, BBox, ImageTextEncoder, OcrEngine, OcrWord, Result, ZeroShotClassifier,
};
use brand_audit::layout::{ManifestDocument, ManifestPage, NativeBlock, TextSpan};
use brand_audit::logo_detection::FastGradientExtractor;
use brand_audit::orchestrator::ModelHost;
use brand_audit::typography::GlyphEncoder;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;

/// Every image is "a photograph"; prompts map to fixed axes
pub struct AxisEncoder;

impl ImageTextEncoder for AxisEncoder {
    fn encode_images(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![0.0, 1.0, 0.0, 0.0]; images.len()])
    }

    fn encode_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| match t.as_str() {
                "a logo" => vec![1.0, 0.0, 0.0, 0.0],
                "generic imagery" => vec![0.0, 0.0, 1.0, 0.0],
                "text screenshot" => vec![0.0, 0.0, 0.0, 1.0],
                t if t.contains("cartoon") => vec![0.0, 0.0, 0.0, 1.0],
                _ => vec![0.0, 1.0, 0.0, 0.0],
            })
            .collect())
    }
}

pub struct FlatClassifier(pub f32);

impl ZeroShotClassifier for FlatClassifier {
    fn classify(&self, texts: &[String], labels: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![self.0; labels.len()]; texts.len()])
    }
}

/// Fixed word boxes for full pages, fixed symbol boxes for any block crop
#[derive(Default)]
pub struct ScriptedOcr {
    pub words: Vec<OcrWord>,
    pub symbols: Vec<OcrWord>,
}

impl OcrEngine for ScriptedOcr {
    fn recognize_words(&self, _image: &RgbImage) -> Result<Vec<OcrWord>> {
        Ok(self.words.clone())
    }

    fn recognize_symbols(&self, _image: &RgbImage) -> Result<Vec<OcrWord>> {
        Ok(self.symbols.clone())
    }
}

/// 8x8 ink histogram of the glyph, L2-normalized
pub struct PixelGlyphEncoder;

impl GlyphEncoder for PixelGlyphEncoder {
    fn encode(&self, glyphs: &[GrayImage]) -> Result<Vec<Vec<f32>>> {
        Ok(glyphs
            .iter()
            .map(|g| {
                let mut v = vec![0.0f32; 64];
                for (x, y, p) in g.enumerate_pixels() {
                    let cell = (y * 8 / g.height()) * 8 + x * 8 / g.width();
                    v[cell as usize] += f32::from(255 - p[0]);
                }
                normalize_vector(&mut v);
                v
            })
            .collect())
    }
}

pub fn model_host(ocr: ScriptedOcr) -> ModelHost {
    ModelHost::from_parts(
        Arc::new(FastGradientExtractor::default()),
        Arc::new(AxisEncoder),
        Arc::new(FlatClassifier(0.9)),
        Arc::new(ocr),
        Arc::new(PixelGlyphEncoder),
    )
}

pub fn host_with_ocr(ocr: ScriptedOcr) -> Arc<ModelHost> {
    Arc::new(model_host(ocr))
}

pub fn host() -> Arc<ModelHost> {
    host_with_ocr(ScriptedOcr::default())
}

pub fn word(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> OcrWord {
    OcrWord {
        text: text.to_string(),
        bbox: BBox::new(x0, y0, x1, y1),
        confidence: 92.0,
    }
}

/// Random colored rectangles on grey: plenty of corners, deterministic per seed
pub fn textured_logo(seed: u64, width: u32, height: u32) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = RgbImage::from_pixel(width, height, Rgb([120, 120, 120]));
    for _ in 0..60 {
        let w = rng.random_range(6..20);
        let h = rng.random_range(6..20);
        let x = rng.random_range(0..width - w);
        let y = rng.random_range(0..height - h);
        let color = Rgb([rng.random(), rng.random(), rng.random()]);
        draw_filled_rect_mut(&mut img, Rect::at(x as i32, y as i32).of_size(w, h), color);
    }
    img
}

/// One-page manifest whose point size equals the raster size
pub fn single_page(width: u32, height: u32, blocks: Vec<NativeBlock>) -> ManifestDocument {
    ManifestDocument::new(vec![ManifestPage {
        width: width as f32,
        height: height as f32,
        blocks,
    }])
}

pub fn text_block(bbox: BBox, text: &str, size: f32) -> NativeBlock {
    NativeBlock::Text {
        bbox,
        spans: vec![TextSpan {
            text: text.to_string(),
            size,
            font: String::new(),
        }],
    }
}

pub fn system_font(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from("/usr/share/fonts/truetype/dejavu").join(name);
    path.exists().then_some(path)
}
