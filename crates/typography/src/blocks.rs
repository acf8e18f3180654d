//! Header/body split of OCR text blocks

use brand_audit_common::OcrWord;
use brand_audit_ocr::{group_blocks, TextBlock};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlockKind {
    Header,
    Body,
}

#[derive(Debug, Clone)]
pub struct ClassifiedBlock {
    pub block: TextBlock,
    pub kind: BlockKind,
}

/// Median word box height, 0 for no words
#[must_use]
pub fn median_word_height(words: &[OcrWord]) -> f32 {
    let mut heights: Vec<f32> = words.iter().map(|w| w.bbox.height()).collect();
    if heights.is_empty() {
        return 0.0;
    }
    heights.sort_by(f32::total_cmp);
    let mid = heights.len() / 2;
    if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) / 2.0
    } else {
        heights[mid]
    }
}

/// HEADER iff the block's average word height exceeds `ratio` times the page median
#[must_use]
pub fn classify_block(average_height: f32, page_median: f32, ratio: f32) -> BlockKind {
    if average_height > ratio * page_median {
        BlockKind::Header
    } else {
        BlockKind::Body
    }
}

/// Group page words into blocks and label each one
#[must_use]
pub fn classify_blocks(words: &[OcrWord], header_ratio: f32) -> Vec<ClassifiedBlock> {
    let median = median_word_height(words);
    group_blocks(words)
        .into_iter()
        .map(|block| {
            let kind = classify_block(block.average_word_height(), median, header_ratio);
            ClassifiedBlock { block, kind }
        })
        .collect()
}
