//! Siamese glyph encoder
//!
//! Maps 64x64 grayscale glyphs to unit-length 128-d vectors so that glyphs of
//! the same typeface land close together. Weights are a safetensors file with
//! the tensor layout produced by [`SiameseNet::new`]:
//! `blocks.{0..3}.conv`, `blocks.{0..3}.bn`, `fc1`, `fc2`.

use crate::renderer::GLYPH_SIZE;
use brand_audit_common::{normalize_vector, AuditError, Result};
use candle_core::{DType, Device, ModuleT, Tensor};
use candle_nn::{batch_norm, conv2d, linear, BatchNorm, Conv2d, Conv2dConfig, Dropout, Linear, Module, VarBuilder, VarMap};
use image::GrayImage;
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub const EMBEDDING_DIM: usize = 128;

const CHANNELS: [usize; 5] = [1, 32, 64, 128, 256];
const HIDDEN_DIM: usize = 512;
const DROPOUT: f32 = 0.3;

/// Glyph image to embedding
pub trait GlyphEncoder: Send + Sync {
    /// One L2-normalized vector per 64x64 glyph
    fn encode(&self, glyphs: &[GrayImage]) -> Result<Vec<Vec<f32>>>;
}

struct ConvBlock {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvBlock {
    fn new(in_channels: usize, out_channels: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let config = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        Ok(Self {
            conv: conv2d(in_channels, out_channels, 3, config, vb.pp("conv"))?,
            bn: batch_norm(out_channels, 1e-5, vb.pp("bn"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.conv.forward(xs)?;
        let xs = self.bn.forward_t(&xs, false)?;
        xs.relu()?.max_pool2d(2)
    }
}

struct SiameseNet {
    blocks: Vec<ConvBlock>,
    fc1: Linear,
    dropout: Dropout,
    fc2: Linear,
}

impl SiameseNet {
    fn new(vb: VarBuilder) -> candle_core::Result<Self> {
        let blocks = CHANNELS
            .windows(2)
            .enumerate()
            .map(|(i, pair)| ConvBlock::new(pair[0], pair[1], vb.pp(format!("blocks.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;

        // 64 -> 4 after four 2x2 pools
        let spatial = GLYPH_SIZE as usize >> CHANNELS.len().saturating_sub(1);
        let flat = CHANNELS[CHANNELS.len() - 1] * spatial * spatial;

        Ok(Self {
            blocks,
            fc1: linear(flat, HIDDEN_DIM, vb.pp("fc1"))?,
            dropout: Dropout::new(DROPOUT),
            fc2: linear(HIDDEN_DIM, EMBEDDING_DIM, vb.pp("fc2"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let mut xs = xs.clone();
        for block in &self.blocks {
            xs = block.forward(&xs)?;
        }
        let xs = xs.flatten_from(1)?;
        let xs = self.fc1.forward(&xs)?.relu()?;
        let xs = self.dropout.forward(&xs, false)?;
        self.fc2.forward(&xs)
    }
}

/// Candle implementation of [`GlyphEncoder`], inference only
pub struct SiameseEncoder {
    net: SiameseNet,
    device: Device,
}

impl SiameseEncoder {
    /// Load trained weights from a safetensors file
    pub fn load(weights_path: &Path) -> Result<Self> {
        let start = Instant::now();
        let model_load = |reason: String| AuditError::ModelLoad {
            model: "glyph-encoder".to_string(),
            reason,
        };
        let bytes = std::fs::read(weights_path)
            .map_err(|e| model_load(format!("{}: {e}", weights_path.display())))?;

        let device = Device::Cpu;
        let vb = VarBuilder::from_buffered_safetensors(bytes, DType::F32, &device)
            .map_err(|e| model_load(e.to_string()))?;
        let net = SiameseNet::new(vb).map_err(|e| model_load(e.to_string()))?;

        info!(
            "Loaded glyph encoder from {} in {:.2}s",
            weights_path.display(),
            start.elapsed().as_secs_f64()
        );
        Ok(Self { net, device })
    }

    /// Build from variables held in `varmap`, initializing any that are missing
    pub fn from_varmap(varmap: &VarMap) -> Result<Self> {
        let device = Device::Cpu;
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &device);
        let net = SiameseNet::new(vb).map_err(|e| AuditError::ModelLoad {
            model: "glyph-encoder".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { net, device })
    }

    fn to_tensor(&self, glyphs: &[GrayImage]) -> candle_core::Result<Tensor> {
        let side = GLYPH_SIZE as usize;
        let mut data = Vec::with_capacity(glyphs.len() * side * side);
        for glyph in glyphs {
            let glyph = if glyph.dimensions() == (GLYPH_SIZE, GLYPH_SIZE) {
                glyph.clone()
            } else {
                image::imageops::resize(glyph, GLYPH_SIZE, GLYPH_SIZE, image::imageops::FilterType::Triangle)
            };
            data.extend(glyph.pixels().map(|p| f32::from(p[0]) / 255.0));
        }
        Tensor::from_vec(data, (glyphs.len(), 1, side, side), &self.device)
    }

    fn run(&self, glyphs: &[GrayImage]) -> candle_core::Result<Vec<Vec<f32>>> {
        let input = self.to_tensor(glyphs)?;
        self.net.forward(&input)?.to_dtype(DType::F32)?.to_vec2::<f32>()
    }
}

impl GlyphEncoder for SiameseEncoder {
    fn encode(&self, glyphs: &[GrayImage]) -> Result<Vec<Vec<f32>>> {
        if glyphs.is_empty() {
            return Ok(Vec::new());
        }
        let mut embeddings = self
            .run(glyphs)
            .map_err(|e| AuditError::Inference(format!("glyph encoder: {e}")))?;
        for embedding in &mut embeddings {
            normalize_vector(embedding);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_encode_shapes_and_norm() {
        let varmap = VarMap::new();
        let encoder = SiameseEncoder::from_varmap(&varmap).unwrap();

        let mut glyph = GrayImage::from_pixel(GLYPH_SIZE, GLYPH_SIZE, Luma([255]));
        for y in 16..48 {
            for x in 28..36 {
                glyph.put_pixel(x, y, Luma([0]));
            }
        }
        let small = GrayImage::from_pixel(20, 30, Luma([128]));

        let embeddings = encoder.encode(&[glyph.clone(), small, glyph]).unwrap();
        assert_eq!(embeddings.len(), 3);
        for e in &embeddings {
            assert_eq!(e.len(), EMBEDDING_DIM);
            let norm: f32 = e.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
        }
        // Deterministic in inference mode
        for (a, b) in embeddings[0].iter().zip(&embeddings[2]) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_encode_empty_batch() {
        let encoder = SiameseEncoder::from_varmap(&VarMap::new()).unwrap();
        assert!(encoder.encode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_weights() {
        let err = SiameseEncoder::load(Path::new("/nonexistent/glyph_encoder.safetensors"))
            .err()
            .unwrap();
        assert!(matches!(err, AuditError::ModelLoad { .. }));
    }

    #[test]
    fn test_weights_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glyph_encoder.safetensors");
        let varmap = VarMap::new();
        let encoder = SiameseEncoder::from_varmap(&varmap).unwrap();
        varmap.save(&path).unwrap();

        let loaded = SiameseEncoder::load(&path).unwrap();
        let glyph = GrayImage::from_fn(GLYPH_SIZE, GLYPH_SIZE, |x, y| Luma([((x * 4 + y) % 256) as u8]));
        let a = encoder.encode(std::slice::from_ref(&glyph)).unwrap();
        let b = loaded.encode(&[glyph]).unwrap();
        for (x, y) in a[0].iter().zip(&b[0]) {
            assert!((x - y).abs() < 1e-4);
        }
    }
}
