//! Reviewer-persona critique of a single section, with a fixed fallback
//! whenever the provider fails or answers with something unparsable.

use crate::json::extract_json;
use crate::llm_provider::{GenerationConfig, LLMProvider, LLMResult, Message};
use crate::prompts;
use futures::future::join_all;
use grantcraft_core::{MechanismId, SectionType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 9;
const FALLBACK_SCORE: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Critique {
    /// NIH scale, 1 (exceptional) to 9 (poor).
    pub score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub summary: String,
    /// True when the provider could not be used and this is the canned reply.
    pub fallback: bool,
}

impl Critique {
    pub fn fallback() -> Self {
        Self {
            score: FALLBACK_SCORE,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            suggestions: vec![
                "Automated critique is unavailable right now; review the section against the NIH scoring criteria (significance, investigators, innovation, approach, environment)."
                    .to_string(),
            ],
            summary: "Critique unavailable.".to_string(),
            fallback: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCritique {
    score: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    summary: String,
}

impl From<RawCritique> for Critique {
    fn from(raw: RawCritique) -> Self {
        let score = if raw.score.is_finite() {
            raw.score.round().clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE)) as u8
        } else {
            FALLBACK_SCORE
        };
        Self {
            score,
            strengths: raw.strengths,
            weaknesses: raw.weaknesses,
            suggestions: raw.suggestions,
            summary: raw.summary,
            fallback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueRequest {
    pub section_type: SectionType,
    pub text: String,
}

#[derive(Clone)]
pub struct CritiqueService {
    provider: Arc<dyn LLMProvider>,
    config: GenerationConfig,
}

impl CritiqueService {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            config: GenerationConfig {
                temperature: 0.2,
                ..GenerationConfig::default()
            }
            .json(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    async fn request(
        &self,
        text: &str,
        section_type: SectionType,
        mechanism: MechanismId,
    ) -> LLMResult<Critique> {
        let messages = [
            Message::system(prompts::REVIEWER_SYSTEM),
            Message::user(prompts::critique(text, section_type, mechanism)),
        ];
        let response = self.provider.generate_chat(&messages, &self.config).await?;
        let raw: RawCritique = extract_json(&response.content)?;
        Ok(raw.into())
    }

    /// Never fails: provider and parse errors are logged and replaced with
    /// [`Critique::fallback`].
    pub async fn critique(
        &self,
        text: &str,
        section_type: SectionType,
        mechanism: MechanismId,
    ) -> Critique {
        match self.request(text, section_type, mechanism).await {
            Ok(critique) => {
                debug!(section = %section_type, score = critique.score, "critique generated");
                critique
            }
            Err(e) => {
                warn!(
                    section = %section_type,
                    provider = self.provider.provider_name(),
                    "critique failed, returning fallback: {:#}",
                    e
                );
                Critique::fallback()
            }
        }
    }

    /// Critiques every item concurrently; output order matches input order.
    pub async fn critique_many(
        &self,
        items: &[CritiqueRequest],
        mechanism: MechanismId,
    ) -> Vec<Critique> {
        join_all(
            items
                .iter()
                .map(|item| self.critique(&item.text, item.section_type, mechanism)),
        )
        .await
    }
}
