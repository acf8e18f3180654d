//! Typed page regions produced by layout analysis

use crate::BBox;
use image::RgbImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegionType {
    Text,
    Title,
    SectionHeader,
    Figure,
    /// Structural hint that a figure is probably a logo
    Logo,
    Header,
    Footer,
    Caption,
    Table,
    Unknown,
}

impl RegionType {
    /// Regions whose text feeds brand-voice scoring
    #[must_use]
    pub fn is_body_text(&self) -> bool {
        matches!(self, RegionType::Text | RegionType::Title | RegionType::SectionHeader)
    }

    #[must_use]
    pub fn is_figure(&self) -> bool {
        matches!(self, RegionType::Figure | RegionType::Logo)
    }
}

#[derive(Debug, Clone)]
pub enum RegionContent {
    Text(String),
    Image(RgbImage),
    Empty,
}

impl RegionContent {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            RegionContent::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn image(&self) -> Option<&RgbImage> {
        match self {
            RegionContent::Image(image) => Some(image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutRegion {
    pub id: usize,
    pub region_type: RegionType,
    /// Raster pixel coordinates
    pub bbox: BBox,
    pub confidence: f32,
    pub content: RegionContent,
    /// 1-based
    pub page_number: usize,
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    /// 1-based
    pub page_number: usize,
    /// Raster size in pixels
    pub page_size: (u32, u32),
    pub regions: Vec<LayoutRegion>,
}

impl PageLayout {
    pub fn figures(&self) -> impl Iterator<Item = &LayoutRegion> {
        self.regions.iter().filter(|r| r.region_type.is_figure())
    }

    /// Concatenated text of title, section header and body regions
    #[must_use]
    pub fn body_text(&self) -> String {
        self.regions
            .iter()
            .filter(|r| r.region_type.is_body_text())
            .filter_map(|r| r.content.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Boxes of every content region, used to mask out the background
    #[must_use]
    pub fn content_boxes(&self) -> Vec<BBox> {
        self.regions.iter().map(|r| r.bbox).collect()
    }
}
