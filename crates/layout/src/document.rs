//! Source document handle and page rasters

use brand_audit_common::{AuditError, AuditStage, BBox, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A run of text sharing one font
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    /// Font size in points
    #[serde(default)]
    pub size: f32,
    #[serde(default)]
    pub font: String,
}

/// Native content block in page point coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NativeBlock {
    Text {
        bbox: BBox,
        #[serde(default)]
        spans: Vec<TextSpan>,
    },
    Image {
        bbox: BBox,
    },
}

impl NativeBlock {
    #[must_use]
    pub fn bbox(&self) -> BBox {
        match self {
            NativeBlock::Text { bbox, .. } | NativeBlock::Image { bbox } => *bbox,
        }
    }
}

/// Structural view of the original document
pub trait SourceDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Page width and height in points
    fn page_size(&self, index: usize) -> Result<(f32, f32)>;

    fn blocks(&self, index: usize) -> Result<Vec<NativeBlock>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestPage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub blocks: Vec<NativeBlock>,
}

/// Document structure exported to JSON by an upstream extractor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestDocument {
    pub pages: Vec<ManifestPage>,
}

impl ManifestDocument {
    #[must_use]
    pub fn new(pages: Vec<ManifestPage>) -> Self {
        Self { pages }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AuditError::document(AuditStage::Layout, format!("invalid manifest: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AuditError::document(AuditStage::Layout, format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    fn page(&self, index: usize) -> Result<&ManifestPage> {
        self.pages.get(index).ok_or(AuditError::InvalidPage {
            index,
            page_count: self.pages.len(),
        })
    }
}

impl SourceDocument for ManifestDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32)> {
        let page = self.page(index)?;
        Ok((page.width, page.height))
    }

    fn blocks(&self, index: usize) -> Result<Vec<NativeBlock>> {
        Ok(self.page(index)?.blocks.clone())
    }
}

/// Source of rasterized page bitmaps, fetched one page at a time
pub trait PageRasterizer: Send + Sync {
    fn page_count(&self) -> usize;

    fn rasterize(&self, index: usize) -> Result<RgbImage>;
}

/// Pages already decoded in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPages {
    pages: Vec<RgbImage>,
}

impl InMemoryPages {
    #[must_use]
    pub fn new(pages: Vec<RgbImage>) -> Self {
        Self { pages }
    }
}

impl PageRasterizer for InMemoryPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn rasterize(&self, index: usize) -> Result<RgbImage> {
        self.pages.get(index).cloned().ok_or(AuditError::InvalidPage {
            index,
            page_count: self.pages.len(),
        })
    }
}

/// Page images on disk, decoded lazily
#[derive(Debug, Clone)]
pub struct ImageFilePages {
    paths: Vec<PathBuf>,
}

impl ImageFilePages {
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl PageRasterizer for ImageFilePages {
    fn page_count(&self) -> usize {
        self.paths.len()
    }

    fn rasterize(&self, index: usize) -> Result<RgbImage> {
        let path = self.paths.get(index).ok_or(AuditError::InvalidPage {
            index,
            page_count: self.paths.len(),
        })?;
        let image = image::open(path)
            .map_err(|e| AuditError::document(AuditStage::Rasterization, format!("{}: {e}", path.display())))?;
        Ok(image.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "pages": [{
            "width": 612, "height": 792,
            "blocks": [
                {"type": "text", "bbox": {"x0": 72, "y0": 72, "x1": 540, "y1": 110},
                 "spans": [{"text": "Annual Report", "size": 28, "font": "Inter-Bold"}]},
                {"type": "image", "bbox": {"x0": 72, "y0": 200, "x1": 300, "y1": 400}}
            ]
        }]
    }"#;

    #[test]
    fn test_manifest_round_trip() {
        let doc = ManifestDocument::from_json_str(MANIFEST).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_size(0).unwrap(), (612.0, 792.0));
        let blocks = doc.blocks(0).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], NativeBlock::Text { spans, .. } if spans[0].size == 28.0));
    }

    #[test]
    fn test_invalid_page_index() {
        let doc = ManifestDocument::from_json_str(MANIFEST).unwrap();
        assert!(matches!(
            doc.blocks(3),
            Err(AuditError::InvalidPage { index: 3, page_count: 1 })
        ));
    }

    #[test]
    fn test_corrupt_manifest() {
        let err = ManifestDocument::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, AuditError::DocumentAccess { .. }));
    }

    #[test]
    fn test_missing_page_image_is_rasterization_error() {
        let dir = tempfile::tempdir().unwrap();
        let pages = ImageFilePages::new(vec![dir.path().join("missing.png")]);
        let err = pages.rasterize(0).unwrap_err();
        assert!(err.to_string().contains("rasterization"));
    }
}
