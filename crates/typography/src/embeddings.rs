//! Per-font glyph embedding maps and their on-disk store
//!
//! Layout: `<root>/<kit_id>/<font_file_stem>.json`, one map per font file.

use crate::encoder::GlyphEncoder;
use crate::renderer::{FontRenderer, DEFAULT_CHARSET, GLYPH_SIZE};
use brand_audit_common::{AuditError, BrandKit, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reference embeddings for every supported character of one font
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphEmbeddingMap {
    pub font_family: String,
    pub font_file: String,
    #[serde(default = "default_glyph_size")]
    pub glyph_size: u32,
    /// Character -> unit-length embedding
    pub glyphs: BTreeMap<String, Vec<f32>>,
}

fn default_glyph_size() -> u32 {
    GLYPH_SIZE
}

impl GlyphEmbeddingMap {
    /// Render `charset` with `renderer` and encode all glyphs in one batch
    pub fn build(renderer: &FontRenderer, encoder: &dyn GlyphEncoder, charset: &str, font_file: &str) -> Result<Self> {
        let rendered = renderer.render_charset(charset);
        if rendered.is_empty() {
            return Err(AuditError::MissingReferenceData(format!(
                "font '{}' has no glyphs for the reference charset",
                renderer.family()
            )));
        }
        let (chars, images): (Vec<char>, Vec<_>) = rendered.into_iter().unzip();
        let embeddings = encoder.encode(&images)?;
        if embeddings.len() != chars.len() {
            return Err(AuditError::Inference(format!(
                "glyph encoder returned {} embeddings for {} glyphs",
                embeddings.len(),
                chars.len()
            )));
        }

        let glyphs = chars
            .into_iter()
            .map(|c| c.to_string())
            .zip(embeddings)
            .collect();
        Ok(Self {
            font_family: renderer.family().to_string(),
            font_file: font_file.to_string(),
            glyph_size: GLYPH_SIZE,
            glyphs,
        })
    }

    #[must_use]
    pub fn get(&self, ch: char) -> Option<&[f32]> {
        let mut buf = [0u8; 4];
        self.glyphs.get(&*ch.encode_utf8(&mut buf)).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// All reference fonts of one brand kit
#[derive(Debug, Clone, Default)]
pub struct FontLibrary {
    pub fonts: Vec<GlyphEmbeddingMap>,
}

impl FontLibrary {
    #[must_use]
    pub fn new(fonts: Vec<GlyphEmbeddingMap>) -> Self {
        Self { fonts }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fonts.iter().all(GlyphEmbeddingMap::is_empty)
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.fonts.iter().map(|f| f.font_family.as_str())
    }
}

/// JSON files of glyph embedding maps grouped by brand kit
#[derive(Debug, Clone)]
pub struct GlyphEmbeddingStore {
    root: PathBuf,
}

impl GlyphEmbeddingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, kit_id: &str, font_file: &str) -> PathBuf {
        let stem = Path::new(font_file)
            .file_stem()
            .map_or_else(|| font_file.to_string(), |s| s.to_string_lossy().into_owned());
        self.root.join(kit_id).join(format!("{stem}.json"))
    }

    pub fn save(&self, kit_id: &str, map: &GlyphEmbeddingMap) -> Result<PathBuf> {
        let path = self.path_for(kit_id, &map.font_file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(map)?;
        std::fs::write(&path, json)?;
        debug!("Saved {} glyph embeddings to {}", map.len(), path.display());
        Ok(path)
    }

    pub fn load(&self, kit_id: &str, font_file: &str) -> Result<GlyphEmbeddingMap> {
        let path = self.path_for(kit_id, font_file);
        let json = std::fs::read_to_string(&path).map_err(|e| {
            AuditError::MissingReferenceData(format!("glyph embeddings {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Every map stored for `kit_id`; an absent kit directory yields an empty library
    pub fn load_all(&self, kit_id: &str) -> Result<FontLibrary> {
        let dir = self.root.join(kit_id);
        if !dir.is_dir() {
            warn!("No glyph embeddings stored for brand kit '{kit_id}'");
            return Ok(FontLibrary::default());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut fonts = Vec::with_capacity(paths.len());
        for path in paths {
            let json = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<GlyphEmbeddingMap>(&json) {
                Ok(map) => fonts.push(map),
                Err(e) => warn!("Skipping unreadable glyph map {}: {e}", path.display()),
            }
        }
        info!("Loaded {} reference fonts for brand kit '{kit_id}'", fonts.len());
        Ok(FontLibrary::new(fonts))
    }
}

/// Font ingestion: render, encode, persist
pub struct GlyphEmbeddingIndex<'a> {
    store: &'a GlyphEmbeddingStore,
    encoder: &'a dyn GlyphEncoder,
    charset: String,
}

impl<'a> GlyphEmbeddingIndex<'a> {
    pub fn new(store: &'a GlyphEmbeddingStore, encoder: &'a dyn GlyphEncoder) -> Self {
        Self {
            store,
            encoder,
            charset: DEFAULT_CHARSET.to_string(),
        }
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Ingest one font file under `family` for `kit_id`
    pub fn ingest(&self, kit_id: &str, family: &str, font_path: &Path) -> Result<PathBuf> {
        let renderer = FontRenderer::from_file(family, font_path).map_err(|e| match e {
            AuditError::Io(io) => AuditError::MissingReferenceData(format!("{}: {io}", font_path.display())),
            other => other,
        })?;
        let font_file = font_path
            .file_name()
            .map_or_else(|| font_path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let map = GlyphEmbeddingMap::build(&renderer, self.encoder, &self.charset, &font_file)?;
        let path = self.store.save(kit_id, &map)?;
        info!("Ingested font '{family}' ({} glyphs) for brand kit '{kit_id}'", map.len());
        Ok(path)
    }

    /// Ingest every typography rule of `kit` that names a font file
    pub fn ingest_kit(&self, kit: &BrandKit) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for rule in &kit.typography {
            let Some(font_file) = &rule.font_file else {
                debug!("Typography rule '{}' has no font file", rule.family);
                continue;
            };
            written.push(self.ingest(&kit.id, &rule.family, font_file)?);
        }
        Ok(written)
    }
}
