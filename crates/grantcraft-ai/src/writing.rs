//! Drafting helpers: hypotheses, letters, rewrites and the public narrative.
//! Unlike critique these surface provider errors to the caller.

use crate::json::extract_json;
use crate::llm_provider::{GenerationConfig, LLMProvider, LLMResult, Message};
use crate::prompts;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const MAX_HYPOTHESES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterKind {
    Support,
    Collaboration,
    Commitment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteGoal {
    Clarity,
    Concise,
    Persuasive,
    LayAudience,
}

#[derive(Debug, Deserialize)]
struct HypothesesReply {
    #[serde(default)]
    hypotheses: Vec<String>,
}

#[derive(Clone)]
pub struct WritingService {
    provider: Arc<dyn LLMProvider>,
    config: GenerationConfig,
}

impl WritingService {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            config: GenerationConfig {
                temperature: 0.7,
                ..GenerationConfig::default()
            },
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    async fn complete(&self, prompt: String, config: &GenerationConfig) -> LLMResult<String> {
        let messages = [Message::system(prompts::WRITER_SYSTEM), Message::user(prompt)];
        let response = self.provider.generate_chat(&messages, config).await?;
        let content = response.content.trim().to_string();
        if content.is_empty() {
            return Err(anyhow!("{} returned an empty reply", self.provider.provider_name()));
        }
        Ok(content)
    }

    /// `count` is clamped to 1..=5. A reply that is not the expected JSON is
    /// read line by line instead.
    pub async fn generate_hypotheses(
        &self,
        topic: &str,
        background: &str,
        count: usize,
    ) -> LLMResult<Vec<String>> {
        let count = count.clamp(1, MAX_HYPOTHESES);
        let config = self.config.clone().json();
        let reply = self
            .complete(prompts::hypotheses(topic, background, count), &config)
            .await?;

        let mut hypotheses = match extract_json::<HypothesesReply>(&reply) {
            Ok(parsed) => parsed.hypotheses,
            Err(e) => {
                warn!("hypotheses reply was not JSON, splitting lines: {:#}", e);
                split_lines(&reply)
            }
        };
        hypotheses.retain(|h| !h.trim().is_empty());
        hypotheses.truncate(count);
        debug!(requested = count, returned = hypotheses.len(), "hypotheses generated");
        Ok(hypotheses)
    }

    pub async fn draft_letter(&self, kind: LetterKind, details: &str) -> LLMResult<String> {
        self.complete(prompts::letter(kind, details), &self.config).await
    }

    pub async fn rewrite(&self, text: &str, goal: RewriteGoal) -> LLMResult<String> {
        let config = GenerationConfig {
            temperature: 0.3,
            ..self.config.clone()
        };
        self.complete(prompts::rewrite(text, goal), &config).await
    }

    /// Drafts a Project Narrative from technical text.
    pub async fn summarize_for_public(&self, text: &str) -> LLMResult<String> {
        self.complete(prompts::public_summary(text), &self.config).await
    }
}

/// Strips list markers ("1.", "-", "*") from each non-empty line.
fn split_lines(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')', '-', '*', '•'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
