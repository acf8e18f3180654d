//! ONNX back-ends for the vision/language model interface
//!
//! - [`ClipEncoder`]: CLIP image and text embeddings in one space
//! - [`ZeroShotNli`]: NLI-based multi-label zero-shot text classification

pub mod clip;
pub mod nli;
pub mod session;

pub use clip::{ClipConfig, ClipEncoder};
pub use nli::{NliConfig, ZeroShotNli};
pub use session::create_session;

use ndarray::Array2;
use tokenizers::Encoding;

/// Stack encodings into `(input_ids, attention_mask)`, right-padding with `pad_id`
pub(crate) fn pad_encodings(encodings: &[Encoding], pad_id: u32) -> anyhow::Result<(Array2<i64>, Array2<i64>)> {
    let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
    let batch = encodings.len();
    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);
    for encoding in encodings {
        let tokens = encoding.get_ids();
        let attention = encoding.get_attention_mask();
        ids.extend(tokens.iter().map(|&t| i64::from(t)));
        mask.extend(attention.iter().map(|&m| i64::from(m)));
        for _ in tokens.len()..seq_len {
            ids.push(i64::from(pad_id));
            mask.push(0);
        }
    }
    let ids = Array2::from_shape_vec((batch, seq_len), ids)?;
    let mask = Array2::from_shape_vec((batch, seq_len), mask)?;
    Ok((ids, mask))
}
