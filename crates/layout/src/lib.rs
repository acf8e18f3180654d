//! Structural layout analysis of document pages

pub mod classifier;
pub mod document;

pub use classifier::{LayoutClassifier, LayoutConfig};
pub use document::{
    ImageFilePages, InMemoryPages, ManifestDocument, ManifestPage, NativeBlock, PageRasterizer, SourceDocument,
    TextSpan,
};
