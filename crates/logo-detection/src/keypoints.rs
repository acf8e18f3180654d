//! FAST corners with gradient-orientation histogram descriptors
//!
//! Each corner is described by a 4x4 grid of 8-bin gradient orientation
//! histograms over a 16x16 patch (128 values), L2-normalized, clipped at 0.2
//! and renormalized. Descriptors are upright: no orientation assignment.

use brand_audit_common::{normalize_vector, Keypoint, KeypointExtractor, KeypointSet, Result};
use image::imageops::FilterType;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::corners::{corners_fast9, Corner};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

pub const DESCRIPTOR_LEN: usize = 128;

const PATCH_RADIUS: u32 = 8;
const CELL: u32 = 4;
const BINS: usize = 8;
const CLIP: f32 = 0.2;

type Gradient = ImageBuffer<Luma<i16>, Vec<i16>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeypointConfig {
    /// FAST intensity threshold
    pub fast_threshold: u8,
    /// Corners closer than this (in pixels) to a stronger corner are dropped
    pub suppression_radius: u32,
    /// Strongest keypoints kept per image
    pub max_keypoints: usize,
}

impl Default for KeypointConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            suppression_radius: 3,
            max_keypoints: 1500,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FastGradientExtractor {
    config: KeypointConfig,
}

impl FastGradientExtractor {
    #[must_use]
    pub fn new(config: KeypointConfig) -> Self {
        Self { config }
    }

    fn suppress(&self, mut corners: Vec<Corner>, width: u32, height: u32) -> Vec<Corner> {
        corners.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.y.cmp(&b.y)).then(a.x.cmp(&b.x)));
        let r = self.config.suppression_radius;
        let mut taken = vec![false; (width * height) as usize];
        let mut kept = Vec::new();
        for corner in corners {
            let idx = (corner.y * width + corner.x) as usize;
            if taken[idx] {
                continue;
            }
            for y in corner.y.saturating_sub(r)..=(corner.y + r).min(height - 1) {
                for x in corner.x.saturating_sub(r)..=(corner.x + r).min(width - 1) {
                    taken[(y * width + x) as usize] = true;
                }
            }
            kept.push(corner);
            if kept.len() >= self.config.max_keypoints {
                break;
            }
        }
        kept
    }
}

/// 128-d upright descriptor centred on `(cx, cy)`
fn describe(gx: &Gradient, gy: &Gradient, cx: u32, cy: u32) -> Vec<f32> {
    let mut descriptor = vec![0.0f32; DESCRIPTOR_LEN];
    let x0 = cx - PATCH_RADIUS;
    let y0 = cy - PATCH_RADIUS;
    for dy in 0..2 * PATCH_RADIUS {
        for dx in 0..2 * PATCH_RADIUS {
            let (x, y) = (x0 + dx, y0 + dy);
            let sx = f32::from(gx.get_pixel(x, y)[0]);
            let sy = f32::from(gy.get_pixel(x, y)[0]);
            let magnitude = (sx * sx + sy * sy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let angle = sy.atan2(sx) + PI;
            let bin = ((angle / (2.0 * PI) * BINS as f32) as usize).min(BINS - 1);
            let cell = (dy / CELL) as usize * 4 + (dx / CELL) as usize;
            descriptor[cell * BINS + bin] += magnitude;
        }
    }
    normalize_vector(&mut descriptor);
    for v in &mut descriptor {
        *v = v.min(CLIP);
    }
    normalize_vector(&mut descriptor);
    descriptor
}

impl KeypointExtractor for FastGradientExtractor {
    fn extract(&self, image: &GrayImage) -> Result<KeypointSet> {
        let (width, height) = image.dimensions();
        let mut set = KeypointSet::default();
        if width <= 2 * PATCH_RADIUS || height <= 2 * PATCH_RADIUS {
            return Ok(set);
        }

        let corners = corners_fast9(image, self.config.fast_threshold);
        let inside: Vec<Corner> = corners
            .into_iter()
            .filter(|c| {
                c.x >= PATCH_RADIUS
                    && c.y >= PATCH_RADIUS
                    && c.x + PATCH_RADIUS < width
                    && c.y + PATCH_RADIUS < height
            })
            .collect();
        let corners = self.suppress(inside, width, height);

        let gx = horizontal_sobel(image);
        let gy = vertical_sobel(image);
        for corner in corners {
            set.keypoints.push(Keypoint {
                x: corner.x as f32,
                y: corner.y as f32,
                scale: 1.0,
                response: corner.score,
            });
            set.descriptors.push(describe(&gx, &gy, corner.x, corner.y));
        }
        Ok(set)
    }
}

/// Extract at several scales, mapping keypoints back to full-resolution coordinates
pub fn extract_pyramid(
    extractor: &dyn KeypointExtractor,
    image: &GrayImage,
    scales: &[f32],
) -> Result<KeypointSet> {
    let mut merged = KeypointSet::default();
    for &scale in scales {
        let level = if (scale - 1.0).abs() < f32::EPSILON {
            image.clone()
        } else {
            let w = (image.width() as f32 * scale).round() as u32;
            let h = (image.height() as f32 * scale).round() as u32;
            if w == 0 || h == 0 {
                continue;
            }
            image::imageops::resize(image, w, h, FilterType::Triangle)
        };
        let set = extractor.extract(&level)?;
        merged.keypoints.extend(set.keypoints.into_iter().map(|k| Keypoint {
            x: k.x / scale,
            y: k.y / scale,
            scale,
            response: k.response,
        }));
        merged.descriptors.extend(set.descriptors);
    }
    Ok(merged)
}
