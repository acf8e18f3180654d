//! Brand kit configuration
//!
//! A brand kit is loaded from YAML or JSON, validated once, and then shared
//! read-only by every auditor for the duration of an audit.

use crate::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_kit_id() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandKit {
    /// Key under which glyph embeddings are stored
    #[serde(default = "default_kit_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub colors: Vec<BrandColor>,
    #[serde(default)]
    pub typography: Vec<TypographyRule>,
    #[serde(default)]
    pub logo: LogoGuidelines,
    #[serde(default)]
    pub brand_voice: BrandVoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandColor {
    pub name: String,
    #[serde(default)]
    pub hex: String,
    #[serde(default)]
    pub rgb: Option<[u8; 3]>,
    #[serde(default)]
    pub cmyk: Option<String>,
    #[serde(default)]
    pub usage: String,
    /// e.g. "white text only" when this color is used as a background
    #[serde(default)]
    pub text_color_rule: Option<String>,
}

impl BrandColor {
    /// RGB value, preferring the explicit `rgb` field over `hex`
    #[must_use]
    pub fn rgb(&self) -> Option<[u8; 3]> {
        self.rgb.or_else(|| parse_hex(&self.hex))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypographyRule {
    pub family: String,
    #[serde(default)]
    pub use_case: String,
    #[serde(default)]
    pub font_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogoGuidelines {
    #[serde(default)]
    pub allowed_ratios: Vec<f32>,
    #[serde(default)]
    pub rules: Vec<LogoRule>,
    #[serde(default)]
    pub assets: Vec<LogoAsset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoRule {
    pub rule: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Reference logo image on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoAsset {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandVoice {
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub frequent_keywords: Vec<String>,
    #[serde(default)]
    pub forbidden_keywords: Vec<String>,
}

/// Parse `#RRGGBB`, `RRGGBB` or `#RGB`
#[must_use]
pub fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return None;
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

impl BrandKit {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let kit: BrandKit = serde_yaml::from_str(yaml)?;
        kit.validate()?;
        Ok(kit)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let kit: BrandKit = serde_json::from_str(json)?;
        kit.validate()?;
        Ok(kit)
    }

    /// Load from a `.json` file, anything else is read as YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut kit = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&raw)?,
            _ => Self::from_yaml_str(&raw)?,
        };
        if let Some(base) = path.parent() {
            kit.resolve_paths(base);
        }
        Ok(kit)
    }

    /// Make relative asset and font paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for asset in &mut self.logo.assets {
            if asset.path.is_relative() {
                asset.path = base.join(&asset.path);
            }
        }
        for rule in &mut self.typography {
            if let Some(file) = rule.font_file.as_mut() {
                if file.is_relative() {
                    *file = base.join(&*file);
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AuditError::Config("brand kit name is empty".to_string()));
        }
        if self.id.trim().is_empty() || self.id.contains(['/', '\\']) {
            return Err(AuditError::Config(format!("invalid brand kit id '{}'", self.id)));
        }
        for color in &self.colors {
            if color.rgb.is_none() && parse_hex(&color.hex).is_none() {
                return Err(AuditError::Config(format!(
                    "color '{}' has no rgb value and an unparsable hex '{}'",
                    color.name, color.hex
                )));
            }
        }
        for rule in &self.typography {
            if rule.family.trim().is_empty() {
                return Err(AuditError::Config("typography entry with empty family".to_string()));
            }
        }
        if let Some(ratio) = self.logo.allowed_ratios.iter().find(|r| !(**r > 0.0) || !r.is_finite()) {
            return Err(AuditError::Config(format!("invalid logo ratio {ratio}")));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_allowed_font(&self, family: &str) -> bool {
        self.typography
            .iter()
            .any(|t| t.family.eq_ignore_ascii_case(family.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIT: &str = r##"
id: acme
name: Acme
colors:
  - name: Acme Red
    hex: "#D32F2F"
    usage: primary
    text_color_rule: white text only
  - name: Ink
    hex: "#222"
    rgb: [30, 30, 30]
typography:
  - family: Inter
    use_case: body
logo:
  allowed_ratios: [2.0]
  rules:
    - rule: clear space equal to the cap height
      type: spacing
brand_voice:
  attributes: [confident, friendly]
  frequent_keywords: [innovation, people]
  forbidden_keywords: [cheap]
"##;

    #[test]
    fn test_parse_yaml_kit() {
        let kit = BrandKit::from_yaml_str(KIT).unwrap();
        assert_eq!(kit.id, "acme");
        assert_eq!(kit.colors[0].rgb(), Some([0xD3, 0x2F, 0x2F]));
        // explicit rgb wins over hex
        assert_eq!(kit.colors[1].rgb(), Some([30, 30, 30]));
        assert_eq!(kit.logo.rules[0].kind, "spacing");
        assert!(kit.is_allowed_font("inter"));
        assert!(!kit.is_allowed_font("Comic Sans"));
    }

    #[test]
    fn test_defaults() {
        let kit = BrandKit::from_yaml_str("name: Bare").unwrap();
        assert_eq!(kit.id, "default");
        assert!(kit.colors.is_empty());
        assert!(kit.logo.allowed_ratios.is_empty());
    }

    #[test]
    fn test_rejects_bad_hex() {
        let err = BrandKit::from_yaml_str("name: X\ncolors:\n  - name: Bad\n    hex: '#12'\n").unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[test]
    fn test_rejects_non_ascii_hex() {
        assert_eq!(parse_hex("#€"), None);
        assert_eq!(parse_hex("€€"), None);
        let err = BrandKit::from_yaml_str("name: Acme\ncolors:\n  - name: Red\n    hex: '#€'\n").unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let err = BrandKit::from_yaml_str("name: X\nlogo:\n  allowed_ratios: [0.0]\n").unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[test]
    fn test_from_path_resolves_assets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kit.json");
        std::fs::write(
            &path,
            r#"{"name": "Acme", "logo": {"assets": [{"name": "primary", "path": "logo.png"}]}}"#,
        )
        .unwrap();
        let kit = BrandKit::from_path(&path).unwrap();
        assert_eq!(kit.logo.assets[0].path, dir.path().join("logo.png"));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#ffffff"), Some([255, 255, 255]));
        assert_eq!(parse_hex("0a0"), Some([0, 0xaa, 0]));
        assert_eq!(parse_hex("zzzzzz"), None);
    }
}
