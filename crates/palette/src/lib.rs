//! Brand palette compliance
//!
//! - Background check: sampled background pixels vote against the brand colors.
//! - Text-color check: per text block, foreground/background separation with
//!   Otsu thresholding and evaluation of the background color's text rule.

pub mod background;
pub mod color;
pub mod text_color;

pub use background::BackgroundSample;
pub use text_color::TextColorRule;

use brand_audit_common::BrandKit;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Background pixels sampled per page
    pub max_samples: usize,
    /// RGB distance within which a pixel matches a brand color
    pub match_distance: f32,
    /// Pixels with every channel above this are neutral white
    pub neutral_white_min: u8,
    /// Pixels with every channel below this are neutral black
    pub neutral_black_max: u8,
    /// Match ratio a page must exceed to pass
    pub pass_ratio: f32,
    /// RGB distance within which a text background maps to a brand color
    pub background_map_distance: f32,
    /// Distance within which text matches a color named by a rule
    pub rule_color_distance: f32,
    pub seed: u64,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            max_samples: 5000,
            match_distance: 45.0,
            neutral_white_min: 240,
            neutral_black_max: 15,
            pass_ratio: 0.70,
            background_map_distance: 60.0,
            rule_color_distance: 60.0,
            seed: 42,
        }
    }
}

/// Palette auditor bound to one brand kit
pub struct PaletteAuditor {
    /// Named brand colors as RGB
    palette: Vec<(String, [f32; 3])>,
    /// Text rules keyed by index into `palette`
    rules: Vec<Option<(String, TextColorRule)>>,
    config: PaletteConfig,
}

impl PaletteAuditor {
    #[must_use]
    pub fn new(brand_kit: &BrandKit, config: PaletteConfig) -> Self {
        let mut palette = Vec::new();
        let mut rules = Vec::new();
        for c in &brand_kit.colors {
            let Some(rgb) = c.rgb() else { continue };
            palette.push((c.name.clone(), color::to_f32(rgb)));
            rules.push(
                c.text_color_rule
                    .as_deref()
                    .and_then(|raw| TextColorRule::parse(raw).map(|rule| (raw.to_string(), rule))),
            );
        }
        Self { palette, rules, config }
    }

    #[must_use]
    pub fn has_colors(&self) -> bool {
        !self.palette.is_empty()
    }

    #[must_use]
    pub fn config(&self) -> &PaletteConfig {
        &self.config
    }

    /// Nearest brand color to `rgb` and its distance
    fn nearest(&self, rgb: [f32; 3]) -> Option<(usize, f32)> {
        self.palette
            .iter()
            .enumerate()
            .map(|(i, (_, c))| (i, color::distance(rgb, *c)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
