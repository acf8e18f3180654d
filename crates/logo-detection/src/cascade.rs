//! Vision-language fallback for figures the keypoint matcher did not explain
//!
//! Order: distorted logo, then third-party logo, then generic imagery fit.
//! The first stage that fires ends the cascade for that region.

use crate::variant::LogoVariant;
use brand_audit_common::{
    cosine_similarity, softmax, AuditError, BBox, BrandKit, FindingKind, ImageTextEncoder, InspectionResult, Level,
    Result,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Similarity to a logo variant above which a region is a distorted logo
    pub distorted_similarity: f32,
    /// First prompt is the logo prompt
    pub category_prompts: Vec<String>,
    pub negative_prompt: String,
    /// Used when the brand has no frequent keywords
    pub fallback_positive_prompt: String,
    /// Positive-prompt probability required to pass
    pub imagery_pass_probability: f32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            distorted_similarity: 0.85,
            category_prompts: vec![
                "a logo".to_string(),
                "a photograph".to_string(),
                "generic imagery".to_string(),
                "text screenshot".to_string(),
            ],
            negative_prompt: "cartoon, blurry, text overlay, screenshot, low resolution".to_string(),
            fallback_positive_prompt: "professional, high quality brand imagery".to_string(),
            imagery_pass_probability: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CascadeVerdict {
    DistortedLogo { variant: String, similarity: f32 },
    PartnerLogo { probability: f32 },
    Imagery { probability: f32, compliant: bool },
}

impl CascadeVerdict {
    #[must_use]
    pub fn to_result(&self, bbox: BBox) -> InspectionResult {
        match self {
            CascadeVerdict::DistortedLogo { variant, similarity } => InspectionResult::warning(
                FindingKind::Logo,
                bbox,
                format!("potential distorted logo (similarity {similarity:.2})"),
            )
            .with_variant(variant.clone()),
            CascadeVerdict::PartnerLogo { probability } => InspectionResult::info(
                FindingKind::Logo,
                bbox,
                format!("external/partner logo (p={probability:.2})"),
            ),
            CascadeVerdict::Imagery { probability, compliant: true } => {
                InspectionResult::pass(FindingKind::Imagery, bbox, format!("imagery brand fit {probability:.2}"))
            }
            CascadeVerdict::Imagery { probability, compliant: false } => InspectionResult::fail(
                FindingKind::Imagery,
                bbox,
                Level::Medium,
                format!("imagery brand fit {probability:.2}"),
            ),
        }
    }
}

/// Precomputed reference embeddings for one audit session
pub struct SemanticCascade {
    variant_embeddings: Vec<(String, Vec<f32>)>,
    category_embeddings: Vec<Vec<f32>>,
    positive_embedding: Vec<f32>,
    negative_embedding: Vec<f32>,
    logit_scale: f32,
    config: CascadeConfig,
}

impl SemanticCascade {
    /// Encode logo references and prompts once, in two batched calls
    pub fn prepare(
        encoder: &dyn ImageTextEncoder,
        variants: &[LogoVariant],
        brand_kit: &BrandKit,
        config: CascadeConfig,
    ) -> Result<Self> {
        if config.category_prompts.is_empty() {
            return Err(AuditError::Config("cascade needs at least one category prompt".to_string()));
        }
        let references: Vec<_> = variants.iter().map(|v| v.reference_image.clone()).collect();
        let variant_vectors = encoder.encode_images(&references)?;
        if variant_vectors.len() != variants.len() {
            return Err(AuditError::Inference(format!(
                "encoder returned {} embeddings for {} logo variants",
                variant_vectors.len(),
                variants.len()
            )));
        }

        let positive_prompt = if brand_kit.brand_voice.frequent_keywords.is_empty() {
            config.fallback_positive_prompt.clone()
        } else {
            brand_kit.brand_voice.frequent_keywords.join(", ")
        };
        let mut prompts = config.category_prompts.clone();
        prompts.push(positive_prompt);
        prompts.push(config.negative_prompt.clone());
        let mut prompt_vectors = encoder.encode_texts(&prompts)?;
        if prompt_vectors.len() != prompts.len() {
            return Err(AuditError::Inference(format!(
                "encoder returned {} embeddings for {} prompts",
                prompt_vectors.len(),
                prompts.len()
            )));
        }
        let negative_embedding = prompt_vectors.pop().unwrap_or_default();
        let positive_embedding = prompt_vectors.pop().unwrap_or_default();

        Ok(Self {
            variant_embeddings: variants.iter().map(|v| v.name.clone()).zip(variant_vectors).collect(),
            category_embeddings: prompt_vectors,
            positive_embedding,
            negative_embedding,
            logit_scale: encoder.logit_scale(),
            config,
        })
    }

    /// Judge one region given its image embedding
    #[must_use]
    pub fn evaluate(&self, embedding: &[f32]) -> CascadeVerdict {
        let best_variant = self
            .variant_embeddings
            .iter()
            .map(|(name, v)| (name, cosine_similarity(embedding, v)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((name, similarity)) = best_variant {
            if similarity > self.config.distorted_similarity {
                debug!("Region resembles logo '{}' ({:.3})", name, similarity);
                return CascadeVerdict::DistortedLogo {
                    variant: name.clone(),
                    similarity,
                };
            }
        }

        let logits: Vec<f32> = self
            .category_embeddings
            .iter()
            .map(|p| cosine_similarity(embedding, p) * self.logit_scale)
            .collect();
        let probabilities = softmax(&logits);
        let winner = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        if winner == Some(0) {
            return CascadeVerdict::PartnerLogo {
                probability: probabilities[0],
            };
        }

        let pair = [
            cosine_similarity(embedding, &self.positive_embedding) * self.logit_scale,
            cosine_similarity(embedding, &self.negative_embedding) * self.logit_scale,
        ];
        let probability = softmax(&pair)[0];
        CascadeVerdict::Imagery {
            probability,
            compliant: probability > self.config.imagery_pass_probability,
        }
    }
}
