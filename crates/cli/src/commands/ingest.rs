//! `ingest-font`: build glyph embedding maps for a brand kit

use anyhow::{Context as _, Result};
use brand_audit_common::BrandKit;
use brand_audit_typography::{GlyphEmbeddingIndex, GlyphEmbeddingStore, SiameseEncoder, DEFAULT_CHARSET};
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Args)]
pub struct IngestFontCommand {
    /// Brand kit (YAML or JSON)
    #[arg(long)]
    kit: PathBuf,

    /// Font file to ingest; every font file listed in the kit when omitted
    #[arg(long)]
    font: Option<PathBuf>,

    /// Family name for --font; looked up in the kit, then the file stem
    #[arg(long)]
    family: Option<String>,

    /// Glyph encoder weights (safetensors)
    #[arg(long)]
    weights: PathBuf,

    /// Glyph embedding store directory
    #[arg(long)]
    store: PathBuf,

    /// Characters to render
    #[arg(long, default_value = DEFAULT_CHARSET)]
    charset: String,
}

impl IngestFontCommand {
    pub fn execute(self) -> Result<()> {
        let start = Instant::now();
        let kit = BrandKit::from_path(&self.kit)
            .with_context(|| format!("Failed to load brand kit {}", self.kit.display()))?;
        let encoder = SiameseEncoder::load(&self.weights).context("Failed to load glyph encoder")?;
        let store = GlyphEmbeddingStore::new(&self.store);
        let index = GlyphEmbeddingIndex::new(&store, &encoder).with_charset(self.charset.clone());

        let written = match &self.font {
            Some(font) => {
                let family = self.family_for(&kit, font);
                vec![index
                    .ingest(&kit.id, &family, font)
                    .with_context(|| format!("Failed to ingest {}", font.display()))?]
            }
            None => index.ingest_kit(&kit).context("Failed to ingest brand kit fonts")?,
        };

        if written.is_empty() {
            anyhow::bail!("Brand kit '{}' lists no font files; pass --font", kit.id);
        }
        for path in &written {
            println!("{}", path.display());
        }
        info!(
            "Ingested {} font(s) for '{}' in {:.2}s",
            written.len(),
            kit.id,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn family_for(&self, kit: &BrandKit, font: &Path) -> String {
        if let Some(family) = &self.family {
            return family.clone();
        }
        let file_name = font.file_name();
        kit.typography
            .iter()
            .find(|rule| rule.font_file.as_deref().and_then(Path::file_name) == file_name)
            .map(|rule| rule.family.clone())
            .or_else(|| font.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| font.display().to_string())
    }
}
