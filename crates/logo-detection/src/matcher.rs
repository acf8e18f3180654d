//! Keypoint-based logo localization and compliance (cascade stage 1)

use crate::homography::{find_homography, RansacParams};
use crate::variant::{color_distance, mean_color, LogoVariant};
use brand_audit_common::{BBox, FindingKind, InspectionResult, KeypointSet, Level};
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoMatcherConfig {
    /// Lowe ratio: best distance must be below this fraction of the second best
    pub ratio_test: f32,
    /// Accepted matches required before fitting a homography
    pub min_matches: usize,
    pub ransac_threshold: f64,
    pub ransac_iterations: usize,
    pub ransac_seed: u64,
    /// Minimum candidate width and height in pixels
    pub min_size: f32,
    /// Candidates whose aspect ratio deviates more than this from the reference are discarded
    pub aspect_tolerance: f32,
    /// Candidates whose top-left corners are closer than this are duplicates
    pub dedup_distance: f32,
    /// Aspect deviation allowed for a compliant logo
    pub compliance_aspect_tolerance: f32,
    /// Maximum mean-RGB distance for a compliant logo
    pub max_color_distance: f32,
    /// Pyramid scales used to describe reference logos
    pub reference_scales: Vec<f32>,
}

impl Default for LogoMatcherConfig {
    fn default() -> Self {
        Self {
            ratio_test: 0.65,
            min_matches: 15,
            ransac_threshold: 5.0,
            ransac_iterations: 1000,
            ransac_seed: 0x5eed_1090,
            min_size: 30.0,
            aspect_tolerance: 0.25,
            dedup_distance: 50.0,
            compliance_aspect_tolerance: 0.20,
            max_color_distance: 65.0,
            reference_scales: vec![0.5, 0.75, 1.0, 1.5],
        }
    }
}

/// A localized logo before compliance checks
#[derive(Debug, Clone, PartialEq)]
pub struct LogoCandidate {
    /// Index into the matcher's variants
    pub variant: usize,
    /// Page pixel coordinates
    pub bbox: BBox,
    pub matches: usize,
    pub inliers: usize,
}

/// A candidate with its compliance verdict
#[derive(Debug, Clone, PartialEq)]
pub struct LogoMatch {
    pub candidate: LogoCandidate,
    pub variant_name: String,
    pub aspect_deviation: f32,
    pub color_distance: f32,
    pub compliant: bool,
}

impl LogoMatch {
    #[must_use]
    pub fn to_result(&self) -> InspectionResult {
        let bbox = self.candidate.bbox;
        let result = if self.compliant {
            InspectionResult::pass(FindingKind::Logo, bbox, self.variant_name.clone())
        } else {
            InspectionResult::fail(FindingKind::Logo, bbox, Level::Critical, self.variant_name.clone())
        };
        result.with_variant(self.variant_name.clone())
    }
}

pub struct LogoMatcher {
    variants: Vec<LogoVariant>,
    config: LogoMatcherConfig,
    allowed_ratios: Vec<f32>,
}

impl LogoMatcher {
    /// Variants without descriptors are dropped
    #[must_use]
    pub fn new(variants: Vec<LogoVariant>, config: LogoMatcherConfig) -> Self {
        let variants = variants
            .into_iter()
            .filter(|v| {
                if !v.has_descriptors() {
                    warn!("Logo variant '{}' has no keypoints, excluded from matching", v.name);
                }
                v.has_descriptors()
            })
            .collect();
        Self {
            variants,
            config,
            allowed_ratios: Vec::new(),
        }
    }

    /// Extra width/height ratios a placed logo may take besides its reference
    #[must_use]
    pub fn with_allowed_ratios(mut self, ratios: Vec<f32>) -> Self {
        self.allowed_ratios = ratios.into_iter().filter(|r| r.is_finite() && *r > 0.0).collect();
        self
    }

    /// Smallest deviation from the variant ratio or any allowed ratio
    fn closest_aspect_deviation(&self, candidate: f32, variant: &LogoVariant) -> f32 {
        self.allowed_ratios
            .iter()
            .map(|&r| aspect_deviation(candidate, r))
            .fold(aspect_deviation(candidate, variant.aspect_ratio), f32::min)
    }

    #[must_use]
    pub fn variants(&self) -> &[LogoVariant] {
        &self.variants
    }

    #[must_use]
    pub fn config(&self) -> &LogoMatcherConfig {
        &self.config
    }

    /// Ratio-test matches `(variant index, page index)` for one variant
    fn ratio_matches(&self, variant: &LogoVariant, page: &KeypointSet) -> Vec<(usize, usize)> {
        if page.len() < 2 {
            return Vec::new();
        }
        let ratio_sq = self.config.ratio_test * self.config.ratio_test;
        variant
            .keypoints
            .descriptors
            .par_iter()
            .enumerate()
            .filter_map(|(qi, query)| {
                let mut best = (f32::INFINITY, usize::MAX);
                let mut second = f32::INFINITY;
                for (ti, train) in page.descriptors.iter().enumerate() {
                    let d = squared_distance(query, train);
                    if d < best.0 {
                        second = best.0;
                        best = (d, ti);
                    } else if d < second {
                        second = d;
                    }
                }
                (best.0 < ratio_sq * second).then_some((qi, best.1))
            })
            .collect()
    }

    fn locate_variant(&self, index: usize, page: &KeypointSet, page_size: (u32, u32)) -> Option<LogoCandidate> {
        let variant = &self.variants[index];
        let matches = self.ratio_matches(variant, page);
        if matches.len() < self.config.min_matches {
            debug!(
                "Variant '{}': {} matches, below {}",
                variant.name,
                matches.len(),
                self.config.min_matches
            );
            return None;
        }

        let (src, dst): (Vec<_>, Vec<_>) = matches
            .iter()
            .map(|&(qi, ti)| {
                let q = variant.keypoints.keypoints[qi];
                let t = page.keypoints[ti];
                ((f64::from(q.x), f64::from(q.y)), (f64::from(t.x), f64::from(t.y)))
            })
            .unzip();
        let params = RansacParams {
            threshold: self.config.ransac_threshold,
            iterations: self.config.ransac_iterations,
            seed: self.config.ransac_seed,
        };
        let fit = find_homography(&src, &dst, &params)?;

        let (w, h) = (f64::from(variant.width), f64::from(variant.height));
        let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let projected: Option<Vec<(f32, f32)>> = corners
            .iter()
            .map(|&(x, y)| fit.homography.project(x, y).map(|(px, py)| (px as f32, py as f32)))
            .collect();
        let bbox = BBox::enclosing(&projected?)?.clamp(page_size.0 as f32, page_size.1 as f32);

        if bbox.width() < self.config.min_size || bbox.height() < self.config.min_size {
            debug!("Variant '{}': candidate {:?} too small", variant.name, bbox);
            return None;
        }
        if aspect_deviation(bbox.aspect_ratio(), variant.aspect_ratio) > self.config.aspect_tolerance {
            debug!("Variant '{}': candidate {:?} aspect ratio out of range", variant.name, bbox);
            return None;
        }
        Some(LogoCandidate {
            variant: index,
            bbox,
            matches: matches.len(),
            inliers: fit.inlier_count(),
        })
    }

    /// Candidates across all variants, deduplicated by top-left proximity
    #[must_use]
    pub fn locate(&self, page: &KeypointSet, page_size: (u32, u32)) -> Vec<LogoCandidate> {
        let mut candidates: Vec<LogoCandidate> = (0..self.variants.len())
            .filter_map(|i| self.locate_variant(i, page, page_size))
            .collect();
        candidates.sort_by(|a, b| {
            b.matches
                .cmp(&a.matches)
                .then(a.variant.cmp(&b.variant))
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let mut kept: Vec<LogoCandidate> = Vec::new();
        for candidate in candidates {
            let duplicate = kept.iter().any(|k| {
                let dx = k.bbox.x0 - candidate.bbox.x0;
                let dy = k.bbox.y0 - candidate.bbox.y0;
                (dx * dx + dy * dy).sqrt() < self.config.dedup_distance
            });
            if !duplicate {
                kept.push(candidate);
            }
        }
        kept
    }

    /// Locate logos on a page and judge geometry and color against their reference
    #[must_use]
    pub fn match_page(&self, page: &RgbImage, keypoints: &KeypointSet) -> Vec<LogoMatch> {
        self.locate(keypoints, page.dimensions())
            .into_iter()
            .map(|candidate| {
                let variant = &self.variants[candidate.variant];
                let deviation = self.closest_aspect_deviation(candidate.bbox.aspect_ratio(), variant);
                let distance = candidate
                    .bbox
                    .pixel_rect(page.width(), page.height())
                    .map(|(x, y, w, h)| {
                        let crop = image::imageops::crop_imm(page, x, y, w, h).to_image();
                        color_distance(mean_color(&crop), variant.mean_color)
                    })
                    .unwrap_or(f32::INFINITY);
                let compliant = deviation <= self.config.compliance_aspect_tolerance
                    && distance <= self.config.max_color_distance;
                debug!(
                    "Logo '{}' at {:?}: aspect deviation {:.3}, color distance {:.1}, compliant {}",
                    variant.name, candidate.bbox, deviation, distance, compliant
                );
                LogoMatch {
                    variant_name: variant.name.clone(),
                    candidate,
                    aspect_deviation: deviation,
                    color_distance: distance,
                    compliant,
                }
            })
            .collect()
    }
}

/// Relative deviation `|candidate / reference - 1|`
#[must_use]
pub fn aspect_deviation(candidate: f32, reference: f32) -> f32 {
    if reference <= 0.0 {
        return f32::INFINITY;
    }
    (candidate / reference - 1.0).abs()
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
