//! Narrow interface over the heavyweight vision and language models
//!
//! Audit logic only talks to these traits. Concrete back-ends (ONNX CLIP,
//! Tesseract, the FAST keypoint extractor) live in their own crates, and
//! tests substitute deterministic fakes.

use crate::{BBox, Result};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Position in full-resolution image pixels
    pub x: f32,
    pub y: f32,
    /// Pyramid scale the keypoint was detected at
    pub scale: f32,
    pub response: f32,
}

/// Keypoints with one descriptor per keypoint
#[derive(Debug, Clone, Default)]
pub struct KeypointSet {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Vec<f32>>,
}

impl KeypointSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Keypoint detector plus descriptor extractor
pub trait KeypointExtractor: Send + Sync {
    fn extract(&self, image: &GrayImage) -> Result<KeypointSet>;
}

/// Paired image/text encoder sharing one embedding space
pub trait ImageTextEncoder: Send + Sync {
    /// One L2-normalized embedding per image
    fn encode_images(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>>;

    /// One L2-normalized embedding per text
    fn encode_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Multiplier applied to cosine similarities before a softmax
    fn logit_scale(&self) -> f32 {
        100.0
    }
}

/// Multi-label zero-shot text classifier
pub trait ZeroShotClassifier: Send + Sync {
    /// `scores[t][l]` is the independent probability that `labels[l]` applies to `texts[t]`
    fn classify(&self, texts: &[String], labels: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// A recognized word or symbol in image pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BBox,
    /// 0-100
    pub confidence: f32,
}

pub trait OcrEngine: Send + Sync {
    fn recognize_words(&self, image: &RgbImage) -> Result<Vec<OcrWord>>;

    /// Character-level boxes
    fn recognize_symbols(&self, image: &RgbImage) -> Result<Vec<OcrWord>>;

    fn recognize_text(&self, image: &RgbImage) -> Result<String> {
        let words = self.recognize_words(image)?;
        Ok(words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }
}
