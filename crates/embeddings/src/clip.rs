//! CLIP image/text encoder
//!
//! Expects a combined CLIP export taking `pixel_values`, `input_ids` and
//! `attention_mask` and producing `image_embeds` and `text_embeds`.

use crate::{pad_encodings, session};
use anyhow::{Context, Result};
use brand_audit_common::{normalize_vector, AuditError, ImageTextEncoder};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];

/// `<|endoftext|>`, also used for padding
const EOT_TOKEN: u32 = 49407;

/// Token ids of "a photo" used to satisfy the text branch on image-only runs
const DUMMY_TOKENS: [i64; 7] = [49406, 320, 2368, 539, 320, 2368, 49407];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
    #[serde(default = "default_logit_scale")]
    pub logit_scale: f32,
}

fn default_image_size() -> u32 {
    224
}

fn default_max_text_len() -> usize {
    77
}

fn default_logit_scale() -> f32 {
    100.0
}

impl ClipConfig {
    pub fn new(model_path: impl Into<PathBuf>, tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
            image_size: default_image_size(),
            max_text_len: default_max_text_len(),
            logit_scale: default_logit_scale(),
        }
    }
}

pub struct ClipEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    config: ClipConfig,
}

impl ClipEncoder {
    pub fn load(config: ClipConfig) -> brand_audit_common::Result<Self> {
        let session = session::create_session("clip", &config.model_path)?;
        let tokenizer = session::load_tokenizer("clip", &config.tokenizer_path)?;
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            config,
        })
    }

    fn preprocess(&self, images: &[RgbImage]) -> Array4<f32> {
        let size = self.config.image_size;
        let side = size as usize;
        let mut tensor = Array4::<f32>::zeros((images.len(), 3, side, side));
        for (i, img) in images.iter().enumerate() {
            let resized = image::imageops::resize(img, size, size, FilterType::CatmullRom);
            for (x, y, pixel) in resized.enumerate_pixels() {
                for c in 0..3 {
                    tensor[[i, c, y as usize, x as usize]] =
                        (f32::from(pixel[c]) / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
                }
            }
        }
        tensor
    }

    fn run_images(&self, images: &[RgbImage]) -> Result<Vec<Vec<f32>>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Encoding {} images with CLIP", images.len());

        let pixels = self.preprocess(images);
        let batch = images.len();
        let mut ids = Vec::with_capacity(batch * DUMMY_TOKENS.len());
        for _ in 0..batch {
            ids.extend_from_slice(&DUMMY_TOKENS);
        }
        let input_ids = Array2::<i64>::from_shape_vec((batch, DUMMY_TOKENS.len()), ids)?;
        let attention_mask = Array2::<i64>::ones((batch, DUMMY_TOKENS.len()));

        self.run(&pixels, &input_ids, &attention_mask, "image_embeds", batch)
    }

    fn run_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Encoding {} prompts with CLIP", texts.len());

        let mut encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {e}"))?;
        for encoding in &mut encodings {
            encoding.truncate(self.config.max_text_len, 0, tokenizers::TruncationDirection::Right);
        }
        let (input_ids, attention_mask) = pad_encodings(&encodings, EOT_TOKEN)?;

        let side = self.config.image_size as usize;
        let pixels = Array4::<f32>::zeros((1, 3, side, side));
        self.run(&pixels, &input_ids, &attention_mask, "text_embeds", texts.len())
    }

    fn run(
        &self,
        pixels: &Array4<f32>,
        input_ids: &Array2<i64>,
        attention_mask: &Array2<i64>,
        output: &str,
        rows: usize,
    ) -> Result<Vec<Vec<f32>>> {
        let pixel_values = TensorRef::from_array_view(pixels.view())
            .context("Failed to convert pixel_values to ort::TensorRef")?;
        let ids = TensorRef::from_array_view(input_ids.view())
            .context("Failed to convert input_ids to ort::TensorRef")?;
        let mask = TensorRef::from_array_view(attention_mask.view())
            .context("Failed to convert attention_mask to ort::TensorRef")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("CLIP session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![
                "pixel_values" => pixel_values,
                "input_ids" => ids,
                "attention_mask" => mask,
            ])
            .context("Failed to run CLIP inference")?;

        let (shape, data) = outputs
            .get(output)
            .with_context(|| format!("CLIP model has no {output} output"))?
            .try_extract_tensor::<f32>()
            .with_context(|| format!("Failed to extract {output}"))?;

        let dim = shape.last().copied().unwrap_or(0) as usize;
        if dim == 0 || data.len() < rows * dim {
            anyhow::bail!("unexpected {output} shape {shape:?} for {rows} inputs");
        }
        Ok(data
            .chunks(dim)
            .take(rows)
            .map(|row| {
                let mut embedding = row.to_vec();
                normalize_vector(&mut embedding);
                embedding
            })
            .collect())
    }
}

impl ImageTextEncoder for ClipEncoder {
    fn encode_images(&self, images: &[RgbImage]) -> brand_audit_common::Result<Vec<Vec<f32>>> {
        self.run_images(images)
            .map_err(|e| AuditError::Inference(format!("CLIP image encoding: {e:#}")))
    }

    fn encode_texts(&self, texts: &[String]) -> brand_audit_common::Result<Vec<Vec<f32>>> {
        self.run_texts(texts)
            .map_err(|e| AuditError::Inference(format!("CLIP text encoding: {e:#}")))
    }

    fn logit_scale(&self) -> f32 {
        self.config.logit_scale
    }
}
