//! Group OCR words into lines and lines into text blocks

use brand_audit_common::{BBox, OcrWord};

/// Words sharing a baseline, ordered left to right
#[derive(Debug, Clone)]
pub struct TextLine {
    pub words: Vec<OcrWord>,
    pub bbox: BBox,
}

impl TextLine {
    fn new(word: OcrWord) -> Self {
        Self {
            bbox: word.bbox,
            words: vec![word],
        }
    }

    fn push(&mut self, word: OcrWord) {
        self.bbox = self.bbox.union(&word.bbox);
        self.words.push(word);
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.bbox.height()
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")
    }
}

/// Consecutive lines of similar height forming a paragraph or heading
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub bbox: BBox,
}

impl TextBlock {
    fn new(line: TextLine) -> Self {
        Self {
            bbox: line.bbox,
            lines: vec![line],
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &OcrWord> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|l| l.words.len()).sum()
    }

    #[must_use]
    pub fn average_word_height(&self) -> f32 {
        let count = self.word_count();
        if count == 0 {
            return 0.0;
        }
        self.words().map(|w| w.bbox.height()).sum::<f32>() / count as f32
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.lines.iter().map(TextLine::text).collect::<Vec<_>>().join("\n")
    }

    fn line_height(&self) -> f32 {
        self.lines.iter().map(TextLine::height).sum::<f32>() / self.lines.len().max(1) as f32
    }
}

fn vertical_overlap(a: &BBox, b: &BBox) -> f32 {
    (a.y1.min(b.y1) - a.y0.max(b.y0)).max(0.0)
}

fn horizontal_overlap(a: &BBox, b: &BBox) -> f32 {
    (a.x1.min(b.x1) - a.x0.max(b.x0)).max(0.0)
}

/// A word joins a line when it overlaps at least half of the shorter height
pub fn group_lines(words: &[OcrWord]) -> Vec<TextLine> {
    let mut sorted: Vec<&OcrWord> = words.iter().filter(|w| w.bbox.height() > 0.0).collect();
    sorted.sort_by(|a, b| a.bbox.center().1.total_cmp(&b.bbox.center().1));

    let mut lines: Vec<TextLine> = Vec::new();
    for word in sorted {
        let joined = lines.iter_mut().rev().find(|line| {
            let overlap = vertical_overlap(&line.bbox, &word.bbox);
            overlap >= 0.5 * line.height().min(word.bbox.height())
        });
        match joined {
            Some(line) => line.push(word.clone()),
            None => lines.push(TextLine::new(word.clone())),
        }
    }

    for line in &mut lines {
        line.words.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    }
    lines.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));
    lines
}

/// Maximum ratio between a line's height and its block's mean line height
const HEIGHT_TOLERANCE: f32 = 1.25;

/// Merge vertically adjacent, horizontally overlapping lines of similar height
pub fn group_blocks(words: &[OcrWord]) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();
    for line in group_lines(words) {
        let target = blocks.iter_mut().rev().find(|block| {
            let block_height = block.line_height();
            let ratio = line.height().max(block_height) / line.height().min(block_height).max(1.0);
            let gap = line.bbox.y0 - block.bbox.y1;
            ratio <= HEIGHT_TOLERANCE
                && gap <= block_height
                && gap >= -0.5 * block_height
                && horizontal_overlap(&block.bbox, &line.bbox) > 0.0
        });
        match target {
            Some(block) => {
                block.bbox = block.bbox.union(&line.bbox);
                block.lines.push(line);
            }
            None => blocks.push(TextBlock::new(line)),
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x: f32, y: f32, w: f32, h: f32) -> OcrWord {
        OcrWord {
            text: text.to_string(),
            bbox: BBox::from_xywh(x, y, w, h),
            confidence: 90.0,
        }
    }

    #[test]
    fn test_words_on_one_baseline_form_a_line() {
        let words = vec![
            word("world", 60.0, 11.0, 50.0, 20.0),
            word("hello", 0.0, 10.0, 50.0, 20.0),
        ];
        let lines = group_lines(&words);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "hello world");
    }

    #[test]
    fn test_heading_separate_from_body() {
        let words = vec![
            word("Big", 0.0, 0.0, 120.0, 48.0),
            word("Title", 130.0, 0.0, 150.0, 48.0),
            word("body", 0.0, 60.0, 40.0, 14.0),
            word("text", 45.0, 60.0, 40.0, 14.0),
            word("more", 0.0, 78.0, 40.0, 14.0),
            word("lines", 45.0, 78.0, 40.0, 14.0),
        ];
        let blocks = group_blocks(&words);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text(), "Big Title");
        assert_eq!(blocks[1].lines.len(), 2);
        assert_eq!(blocks[1].word_count(), 4);
        assert!((blocks[1].average_word_height() - 14.0).abs() < 1e-6);
    }

    #[test]
    fn test_distant_paragraphs_split() {
        let words = vec![
            word("first", 0.0, 0.0, 40.0, 14.0),
            word("second", 0.0, 200.0, 40.0, 14.0),
        ];
        assert_eq!(group_blocks(&words).len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_blocks(&[]).is_empty());
    }
}
