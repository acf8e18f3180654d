//! Audit and model configuration

use crate::voice::BrandVoiceConfig;
use brand_audit_common::{AuditError, Result};
use brand_audit_embeddings::{ClipConfig, NliConfig};
use brand_audit_layout::LayoutConfig;
use brand_audit_logo_detection::{CascadeConfig, KeypointConfig, LogoMatcherConfig};
use brand_audit_ocr::OcrConfig;
use brand_audit_palette::PaletteConfig;
use brand_audit_typography::TypographyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Thresholds of every auditor plus batching limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Pages held in memory at once
    pub chunk_size: usize,
    /// Whole-document audits allowed to run concurrently
    pub max_concurrent_audits: usize,
    pub layout: LayoutConfig,
    pub logo: LogoMatcherConfig,
    pub cascade: CascadeConfig,
    pub palette: PaletteConfig,
    pub typography: TypographyConfig,
    pub brand_voice: BrandVoiceConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            max_concurrent_audits: 1,
            layout: LayoutConfig::default(),
            logo: LogoMatcherConfig::default(),
            cascade: CascadeConfig::default(),
            palette: PaletteConfig::default(),
            typography: TypographyConfig::default(),
            brand_voice: BrandVoiceConfig::default(),
        }
    }
}

impl AuditConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AuditConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(AuditError::Config("chunk_size must be at least 1".to_string()));
        }
        if self.max_concurrent_audits == 0 {
            return Err(AuditError::Config("max_concurrent_audits must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.palette.pass_ratio) {
            return Err(AuditError::Config(format!(
                "palette pass_ratio {} outside [0, 1]",
                self.palette.pass_ratio
            )));
        }
        if self.logo.reference_scales.iter().any(|s| !(*s > 0.0)) {
            return Err(AuditError::Config("logo reference scales must be positive".to_string()));
        }
        Ok(())
    }
}

/// Model artifacts loaded by [`crate::ModelHost::load`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub clip: ClipConfig,
    pub nli: NliConfig,
    /// Safetensors weights of the glyph encoder
    pub glyph_encoder: PathBuf,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub keypoints: KeypointConfig,
}

impl ModelConfig {
    /// Load from YAML; relative model paths resolve against the file's directory
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut config: ModelConfig = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.clip.model_path,
            &mut self.clip.tokenizer_path,
            &mut self.nli.model_path,
            &mut self.nli.tokenizer_path,
            &mut self.glyph_encoder,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_config_defaults() {
        let config = AuditConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.max_concurrent_audits, 1);
        assert_eq!(config.logo.min_matches, 15);
        assert!((config.palette.pass_ratio - 0.70).abs() < 1e-6);
        assert!((config.typography.header_ratio - 1.3).abs() < 1e-6);
    }

    #[test]
    fn test_audit_config_overrides() {
        let yaml = "chunk_size: 4\npalette:\n  max_samples: 100\ntypography:\n  min_similarity: 0.7\n";
        let config = AuditConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.palette.max_samples, 100);
        assert_eq!(config.palette.match_distance, 45.0);
        assert!((config.typography.identify.min_similarity - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_audit_config_rejects_zero_chunk() {
        let err = AuditConfig::from_yaml_str("chunk_size: 0").unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[test]
    fn test_model_config_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.yaml");
        std::fs::write(
            &path,
            "clip:\n  model_path: clip/model.onnx\n  tokenizer_path: clip/tokenizer.json\n\
             nli:\n  model_path: /abs/nli.onnx\n  tokenizer_path: nli/tokenizer.json\n\
             glyph_encoder: glyphs.safetensors\n",
        )
        .unwrap();
        let config = ModelConfig::from_path(&path).unwrap();
        assert_eq!(config.clip.model_path, dir.path().join("clip/model.onnx"));
        assert_eq!(config.nli.model_path, PathBuf::from("/abs/nli.onnx"));
        assert_eq!(config.glyph_encoder, dir.path().join("glyphs.safetensors"));
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.clip.image_size, 224);
    }
}
