//! Zero-shot text classification through a natural-language-inference model
//!
//! Each (text, label) pair is scored as premise/hypothesis. Labels are scored
//! independently: the entailment probability comes from a softmax over the
//! contradiction and entailment logits only.

use crate::{pad_encodings, session};
use anyhow::{Context, Result};
use brand_audit_common::{softmax, AuditError, ZeroShotClassifier};
use ort::session::Session;
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NliConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// `{}` is replaced by the label
    #[serde(default = "default_template")]
    pub hypothesis_template: String,
    #[serde(default)]
    pub contradiction_index: usize,
    #[serde(default = "default_entailment_index")]
    pub entailment_index: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_template() -> String {
    "This example is {}.".to_string()
}

fn default_entailment_index() -> usize {
    2
}

fn default_max_length() -> usize {
    512
}

impl NliConfig {
    pub fn new(model_path: impl Into<PathBuf>, tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
            hypothesis_template: default_template(),
            contradiction_index: 0,
            entailment_index: default_entailment_index(),
            max_length: default_max_length(),
        }
    }
}

pub struct ZeroShotNli {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    pad_id: u32,
    config: NliConfig,
}

impl ZeroShotNli {
    pub fn load(config: NliConfig) -> brand_audit_common::Result<Self> {
        let session = session::create_session("zero-shot-nli", &config.model_path)?;
        let tokenizer = session::load_tokenizer("zero-shot-nli", &config.tokenizer_path)?;
        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("<pad>"))
            .unwrap_or(0);
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            pad_id,
            config,
        })
    }

    fn hypothesis(&self, label: &str) -> String {
        self.config.hypothesis_template.replace("{}", label)
    }

    /// Entailment probability of every label for one premise
    fn score_text(&self, text: &str, labels: &[String]) -> Result<Vec<f32>> {
        let pairs: Vec<(String, String)> = labels
            .iter()
            .map(|label| (text.to_string(), self.hypothesis(label)))
            .collect();
        let mut encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {e}"))?;
        for encoding in &mut encodings {
            encoding.truncate(self.config.max_length, 0, tokenizers::TruncationDirection::Right);
        }
        let (input_ids, attention_mask) = pad_encodings(&encodings, self.pad_id)?;

        let ids = TensorRef::from_array_view(input_ids.view())
            .context("Failed to convert input_ids to ort::TensorRef")?;
        let mask = TensorRef::from_array_view(attention_mask.view())
            .context("Failed to convert attention_mask to ort::TensorRef")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("NLI session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
            ])
            .context("Failed to run NLI inference")?;
        let (shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract NLI logits")?;

        let classes = shape.last().copied().unwrap_or(0) as usize;
        let needed = self.config.contradiction_index.max(self.config.entailment_index);
        if classes <= needed || logits.len() < labels.len() * classes {
            anyhow::bail!("unexpected NLI logits shape {shape:?}");
        }
        Ok(logits
            .chunks(classes)
            .take(labels.len())
            .map(|row| {
                let pair = [
                    row[self.config.contradiction_index],
                    row[self.config.entailment_index],
                ];
                softmax(&pair)[1]
            })
            .collect())
    }
}

impl ZeroShotClassifier for ZeroShotNli {
    fn classify(&self, texts: &[String], labels: &[String]) -> brand_audit_common::Result<Vec<Vec<f32>>> {
        if labels.is_empty() {
            return Ok(vec![Vec::new(); texts.len()]);
        }
        debug!("Zero-shot scoring {} texts against {} labels", texts.len(), labels.len());
        texts
            .iter()
            .map(|text| self.score_text(text, labels))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| AuditError::Inference(format!("zero-shot classification: {e:#}")))
    }
}
