//! Typography compliance
//!
//! Reference fonts are rendered glyph by glyph ([`FontRenderer`]), encoded by a
//! Siamese CNN ([`SiameseEncoder`]) and stored per brand kit
//! ([`GlyphEmbeddingStore`]). At audit time each OCR text block is split into
//! character crops that vote for their nearest reference font.

pub mod auditor;
pub mod blocks;
pub mod embeddings;
pub mod encoder;
pub mod identify;
pub mod renderer;

pub use auditor::{block_finding, TypographyAuditor, TypographyConfig};
pub use blocks::{classify_block, classify_blocks, median_word_height, BlockKind, ClassifiedBlock};
pub use embeddings::{FontLibrary, GlyphEmbeddingIndex, GlyphEmbeddingMap, GlyphEmbeddingStore};
pub use encoder::{GlyphEncoder, SiameseEncoder, EMBEDDING_DIM};
pub use identify::{extract_glyphs, CharacterGlyph, FontDetection, FontIdentifier, IdentifyConfig};
pub use renderer::{FontRenderer, DEFAULT_CHARSET, GLYPH_SIZE};
