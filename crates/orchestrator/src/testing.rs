//! Deterministic stand-ins for the model back-ends

use crate::host::ModelHost;
use brand_audit_common::{
    ImageTextEncoder, KeypointExtractor, KeypointSet, OcrEngine, OcrWord, Result, ZeroShotClassifier,
};
use brand_audit_typography::GlyphEncoder;
use image::{GrayImage, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct NoKeypoints;

impl KeypointExtractor for NoKeypoints {
    fn extract(&self, _image: &GrayImage) -> Result<KeypointSet> {
        Ok(KeypointSet::default())
    }
}

/// Texts map to axis vectors by position in the prompt list; every image is a photograph
#[derive(Default)]
pub struct AxisEncoder {
    pub image_calls: AtomicUsize,
    pub images_seen: AtomicUsize,
}

impl ImageTextEncoder for AxisEncoder {
    fn encode_images(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>> {
        if !images.is_empty() {
            self.image_calls.fetch_add(1, Ordering::SeqCst);
            self.images_seen.fetch_add(images.len(), Ordering::SeqCst);
        }
        Ok(vec![vec![0.0, 1.0, 0.0, 0.0]; images.len()])
    }

    fn encode_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| match t.as_str() {
                "a logo" => vec![1.0, 0.0, 0.0, 0.0],
                "a photograph" => vec![0.0, 1.0, 0.0, 0.0],
                "generic imagery" => vec![0.0, 0.0, 1.0, 0.0],
                "text screenshot" => vec![0.0, 0.0, 0.0, 1.0],
                t if t.contains("cartoon") => vec![0.0, 0.0, 0.0, 1.0],
                _ => vec![0.0, 1.0, 0.0, 0.0],
            })
            .collect())
    }
}

/// Scores every label with the same value
pub struct FlatClassifier {
    pub score: f32,
    pub calls: AtomicUsize,
}

impl FlatClassifier {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ZeroShotClassifier for FlatClassifier {
    fn classify(&self, texts: &[String], labels: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![vec![self.score; labels.len()]; texts.len()])
    }
}

pub struct FixedOcr(pub Vec<OcrWord>);

impl OcrEngine for FixedOcr {
    fn recognize_words(&self, _image: &RgbImage) -> Result<Vec<OcrWord>> {
        Ok(self.0.clone())
    }

    fn recognize_symbols(&self, _image: &RgbImage) -> Result<Vec<OcrWord>> {
        Ok(Vec::new())
    }
}

pub struct ConstGlyphEncoder;

impl GlyphEncoder for ConstGlyphEncoder {
    fn encode(&self, glyphs: &[GrayImage]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![1.0, 0.0]; glyphs.len()])
    }
}

pub fn fake_host(vision: Arc<AxisEncoder>, classifier: Arc<FlatClassifier>) -> ModelHost {
    ModelHost::from_parts(
        Arc::new(NoKeypoints),
        vision,
        classifier,
        Arc::new(FixedOcr(Vec::new())),
        Arc::new(ConstGlyphEncoder),
    )
}
