//! Background color voting

use crate::{color, PaletteAuditor};
use brand_audit_common::{BBox, FindingKind, InspectionResult, Level};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundSample {
    pub sampled: usize,
    pub matched: usize,
}

impl BackgroundSample {
    /// Fraction of sampled pixels on palette, in `[0, 1]`
    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.sampled == 0 {
            0.0
        } else {
            self.matched as f32 / self.sampled as f32
        }
    }
}

impl PaletteAuditor {
    /// Sample pixels outside every content box and count palette matches
    #[must_use]
    pub fn sample_background(&self, page: &RgbImage, content: &[BBox]) -> BackgroundSample {
        let (width, height) = page.dimensions();
        let mut mask = vec![false; width as usize * height as usize];
        for bbox in content {
            if let Some((x, y, w, h)) = bbox.pixel_rect(width, height) {
                for row in y..y + h {
                    let start = (row * width + x) as usize;
                    mask[start..start + w as usize].fill(true);
                }
            }
        }
        let background: Vec<u32> = mask
            .iter()
            .enumerate()
            .filter(|(_, covered)| !**covered)
            .map(|(i, _)| i as u32)
            .collect();

        let picks: Vec<u32> = if background.len() <= self.config.max_samples {
            background
        } else {
            let mut rng = StdRng::seed_from_u64(self.config.seed);
            rand::seq::index::sample(&mut rng, background.len(), self.config.max_samples)
                .iter()
                .map(|i| background[i])
                .collect()
        };

        let matched = picks
            .iter()
            .filter(|&&i| {
                let p = page.get_pixel(i % width, i / width).0;
                self.pixel_matches(p)
            })
            .count();
        BackgroundSample {
            sampled: picks.len(),
            matched,
        }
    }

    fn pixel_matches(&self, rgb: [u8; 3]) -> bool {
        if color::is_neutral(rgb, self.config.neutral_white_min, self.config.neutral_black_max) {
            return true;
        }
        self.nearest(color::to_f32(rgb))
            .is_some_and(|(_, d)| d < self.config.match_distance)
    }

    /// Page-level background verdict; missing brand colors only warn
    #[must_use]
    pub fn audit_background(&self, page: &RgbImage, content: &[BBox]) -> InspectionResult {
        let page_box = BBox::new(0.0, 0.0, page.width() as f32, page.height() as f32);
        if !self.has_colors() {
            return InspectionResult::warning(
                FindingKind::BackgroundColor,
                page_box,
                "no brand colors defined; background not checked",
            );
        }
        let sample = self.sample_background(page, content);
        debug!(
            "Background: {}/{} sampled pixels on palette",
            sample.matched, sample.sampled
        );
        if sample.sampled == 0 {
            return InspectionResult::warning(
                FindingKind::BackgroundColor,
                page_box,
                "no background pixels outside content regions",
            );
        }
        self.background_verdict(sample.ratio(), page_box)
    }

    /// PASS only when the ratio strictly exceeds the pass ratio
    #[must_use]
    pub fn background_verdict(&self, ratio: f32, bbox: BBox) -> InspectionResult {
        let metric = format!("background match ratio {ratio:.2}");
        if ratio > self.config.pass_ratio {
            InspectionResult::pass(FindingKind::BackgroundColor, bbox, metric)
        } else {
            InspectionResult::fail(FindingKind::BackgroundColor, bbox, Level::Medium, metric)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{PaletteAuditor, PaletteConfig};
    use brand_audit_common::{BBox, BrandKit, Status};
    use image::{Rgb, RgbImage};
    use proptest::prelude::*;

    fn kit(colors: &str) -> BrandKit {
        BrandKit::from_yaml_str(&format!("name: Acme\ncolors:\n{colors}")).unwrap()
    }

    fn red_kit() -> BrandKit {
        kit("  - name: Red\n    hex: '#C80000'\n")
    }

    #[test]
    fn test_exact_boundary_fails() {
        // 100 background pixels, 70 on palette
        let mut page = RgbImage::from_pixel(10, 10, Rgb([0, 120, 200]));
        for i in 0..70u32 {
            page.put_pixel(i % 10, i / 10, Rgb([200, 0, 0]));
        }
        let auditor = PaletteAuditor::new(&red_kit(), PaletteConfig::default());
        let sample = auditor.sample_background(&page, &[]);
        assert_eq!(sample.sampled, 100);
        assert_eq!(sample.matched, 70);
        assert_eq!(sample.ratio(), 0.7);
        assert_eq!(auditor.audit_background(&page, &[]).status, Status::Fail);

        page.put_pixel(0, 7, Rgb([200, 0, 0]));
        assert_eq!(auditor.audit_background(&page, &[]).status, Status::Pass);
    }

    #[test]
    fn test_masked_content_is_ignored() {
        let mut page = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        for y in 20..60 {
            for x in 20..60 {
                page.put_pixel(x, y, Rgb([0, 200, 0]));
            }
        }
        let auditor = PaletteAuditor::new(&red_kit(), PaletteConfig::default());
        let unmasked = auditor.sample_background(&page, &[]);
        assert!(unmasked.ratio() < 1.0);
        let masked = auditor.sample_background(&page, &[BBox::new(20.0, 20.0, 60.0, 60.0)]);
        assert_eq!(masked.ratio(), 1.0);
    }

    #[test]
    fn test_sampling_cap_and_determinism() {
        let page = RgbImage::from_fn(200, 200, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let auditor = PaletteAuditor::new(&red_kit(), PaletteConfig::default());
        let a = auditor.sample_background(&page, &[]);
        let b = auditor.sample_background(&page, &[]);
        assert_eq!(a.sampled, 5000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_colors_warns() {
        let auditor = PaletteAuditor::new(&BrandKit::from_yaml_str("name: Bare").unwrap(), PaletteConfig::default());
        let page = RgbImage::from_pixel(20, 20, Rgb([10, 200, 90]));
        assert_eq!(auditor.audit_background(&page, &[]).status, Status::Warning);
    }

    #[test]
    fn test_fully_covered_page_warns() {
        let auditor = PaletteAuditor::new(&red_kit(), PaletteConfig::default());
        let page = RgbImage::from_pixel(20, 20, Rgb([10, 200, 90]));
        let result = auditor.audit_background(&page, &[BBox::new(0.0, 0.0, 20.0, 20.0)]);
        assert_eq!(result.status, Status::Warning);
    }

    proptest! {
        #[test]
        fn prop_ratio_in_unit_interval(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255, w in 1u32..40, h in 1u32..40) {
            let page = RgbImage::from_fn(w, h, |x, y| Rgb([r.wrapping_add(x as u8), g, b.wrapping_add(y as u8)]));
            let auditor = PaletteAuditor::new(&red_kit(), PaletteConfig::default());
            let ratio = auditor.sample_background(&page, &[]).ratio();
            prop_assert!((0.0..=1.0).contains(&ratio));
        }
    }
}
