//! Text-on-background color rules

use crate::{color, PaletteAuditor};
use brand_audit_common::{BBox, FindingKind, InspectionResult, Level};
use image::{DynamicImage, RgbImage};
use imageproc::contrast::otsu_level;
use tracing::debug;

/// Which text colors a brand background may carry
#[derive(Debug, Clone, PartialEq)]
pub enum TextColorRule {
    WhiteOnly,
    DarkOnly,
    /// Brand color names, lowercase
    Colors(Vec<String>),
}

/// Foreground luminance below which text counts as dark
const DARK_TEXT_MAX_LUMINANCE: f32 = 100.0;

impl TextColorRule {
    /// "white text only" → white; "dark"/"black" → dark; else comma-separated color names
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        if lower.contains("white") {
            return Some(TextColorRule::WhiteOnly);
        }
        if lower.contains("dark") || lower.contains("black") {
            return Some(TextColorRule::DarkOnly);
        }
        let names: Vec<String> = lower
            .split(',')
            .map(|n| n.trim().trim_end_matches(" text").trim_end_matches(" only").trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        (!names.is_empty()).then_some(TextColorRule::Colors(names))
    }
}

/// Strict: every channel above 200. Robust: bright, brighter than the
/// background by a margin, and nearly unsaturated.
#[must_use]
pub fn is_white_text(foreground_p95: [f32; 3], background_luminance: f32) -> bool {
    let strict = foreground_p95.iter().all(|c| *c > 200.0);
    let l = color::luminance(foreground_p95);
    let robust = l > 140.0 && l - background_luminance > 60.0 && color::saturation(foreground_p95) < 0.20;
    strict || robust
}

/// Pixels of a crop split by Otsu, minority class first
pub(crate) struct Separation {
    pub foreground: Vec<[u8; 3]>,
    pub background: Vec<[u8; 3]>,
}

/// `None` for uniform crops and exact 50/50 splits
pub(crate) fn separate(crop: &RgbImage) -> Option<Separation> {
    let gray = DynamicImage::ImageRgb8(crop.clone()).to_luma8();
    let level = otsu_level(&gray);
    let mut dark = Vec::new();
    let mut light = Vec::new();
    for (pixel, g) in crop.pixels().zip(gray.pixels()) {
        if g[0] <= level {
            dark.push(pixel.0);
        } else {
            light.push(pixel.0);
        }
    }
    if dark.is_empty() || light.is_empty() || dark.len() == light.len() {
        return None;
    }
    let (foreground, background) = if dark.len() < light.len() { (dark, light) } else { (light, dark) };
    Some(Separation { foreground, background })
}

impl PaletteAuditor {
    /// One FAIL per violating block, or a single PASS
    #[must_use]
    pub fn audit_text_colors(&self, page: &RgbImage, blocks: &[BBox]) -> Vec<InspectionResult> {
        let page_box = BBox::new(0.0, 0.0, page.width() as f32, page.height() as f32);
        if !self.has_colors() {
            return vec![InspectionResult::warning(
                FindingKind::TextColor,
                page_box,
                "no brand colors defined; text colors not checked",
            )];
        }

        let mut violations = Vec::new();
        for bbox in blocks {
            let Some((x, y, w, h)) = bbox.pixel_rect(page.width(), page.height()) else {
                continue;
            };
            let crop = image::imageops::crop_imm(page, x, y, w, h).to_image();
            let Some(split) = separate(&crop) else {
                debug!("Text block {:?}: no usable foreground/background split", bbox);
                continue;
            };
            let background_mean = color::mean(&split.background);
            let Some((index, distance)) = self.nearest(background_mean) else {
                continue;
            };
            if distance > self.config.background_map_distance {
                continue;
            }
            let Some((raw_rule, rule)) = &self.rules[index] else {
                continue;
            };
            let background_name = &self.palette[index].0;

            if let Some(metric) = self.check_rule(rule, raw_rule, background_name, &split, background_mean) {
                violations.push(InspectionResult::fail(FindingKind::TextColor, *bbox, Level::Medium, metric));
            }
        }

        if violations.is_empty() {
            vec![InspectionResult::pass(
                FindingKind::TextColor,
                page_box,
                "text colors follow background rules",
            )]
        } else {
            violations
        }
    }

    /// Violation message, `None` when compliant
    fn check_rule(
        &self,
        rule: &TextColorRule,
        raw_rule: &str,
        background_name: &str,
        split: &Separation,
        background_mean: [f32; 3],
    ) -> Option<String> {
        let compliant = match rule {
            TextColorRule::WhiteOnly => {
                let p95 = color::channel_percentile(&split.foreground, 0.95);
                is_white_text(p95, color::luminance(background_mean))
            }
            TextColorRule::DarkOnly => {
                let median = color::channel_percentile(&split.foreground, 0.5);
                color::luminance(median) < DARK_TEXT_MAX_LUMINANCE
            }
            TextColorRule::Colors(names) => {
                let median = color::channel_percentile(&split.foreground, 0.5);
                self.palette
                    .iter()
                    .filter(|(name, _)| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
                    .any(|(_, c)| color::distance(median, *c) <= self.config.rule_color_distance)
            }
        };
        if compliant {
            return None;
        }
        let fg = color::channel_percentile(&split.foreground, 0.5);
        Some(format!(
            "text color ({:.0}, {:.0}, {:.0}) on {} violates rule '{}'",
            fg[0], fg[1], fg[2], background_name, raw_rule
        ))
    }
}
