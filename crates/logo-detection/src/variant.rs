//! Reference logo variants

use crate::keypoints::extract_pyramid;
use brand_audit_common::{AuditError, KeypointExtractor, KeypointSet, LogoAsset, Result};
use image::{DynamicImage, RgbImage, Rgba};
use tracing::debug;

/// One reference logo asset prepared for matching
#[derive(Debug, Clone)]
pub struct LogoVariant {
    pub name: String,
    /// Keypoints in reference pixel coordinates, one descriptor each
    pub keypoints: KeypointSet,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f32,
    pub mean_color: [f32; 3],
    pub reference_image: RgbImage,
}

impl LogoVariant {
    pub fn from_image(
        name: impl Into<String>,
        image: RgbImage,
        extractor: &dyn KeypointExtractor,
        scales: &[f32],
    ) -> Result<Self> {
        let name = name.into();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(AuditError::Image(format!("logo '{name}' is empty")));
        }
        let gray = DynamicImage::ImageRgb8(image.clone()).to_luma8();
        let keypoints = extract_pyramid(extractor, &gray, scales)?;
        debug!("Logo variant '{}': {} keypoints", name, keypoints.len());
        Ok(Self {
            name,
            keypoints,
            width,
            height,
            aspect_ratio: width as f32 / height as f32,
            mean_color: mean_color(&image),
            reference_image: image,
        })
    }

    pub fn load(asset: &LogoAsset, extractor: &dyn KeypointExtractor, scales: &[f32]) -> Result<Self> {
        let image = image::open(&asset.path).map_err(|e| {
            AuditError::MissingReferenceData(format!(
                "logo asset '{}' at {}: {e}",
                asset.name,
                asset.path.display()
            ))
        })?;
        Self::from_image(asset.name.clone(), flatten_alpha(&image), extractor, scales)
    }

    #[must_use]
    pub fn has_descriptors(&self) -> bool {
        !self.keypoints.is_empty()
    }
}

/// Composite onto white so transparent logo backgrounds read as paper
#[must_use]
pub fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = f32::from(a) / 255.0;
        let blend = |c: u8| (f32::from(c) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

#[must_use]
pub fn mean_color(image: &RgbImage) -> [f32; 3] {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return [0.0; 3];
    }
    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for c in 0..3 {
            sums[c] += u64::from(pixel[c]);
        }
    }
    sums.map(|s| s as f32 / count as f32)
}

#[must_use]
pub fn color_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    a.iter().zip(&b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}
