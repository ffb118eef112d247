//! Scripted in-process provider for tests and offline demos.

use crate::llm_provider::*;
use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// Replays queued replies in order. When the queue is empty the default
/// reply (if any) is returned, otherwise the call fails.
#[derive(Debug, Default)]
pub struct MockProvider {
    queue: Mutex<VecDeque<Scripted>>,
    default_reply: Option<String>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every call with `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            default_reply: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Fails every call.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: impl Into<String>) -> &Self {
        self.queue.lock().push_back(Scripted::Reply(reply.into()));
        self
    }

    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.queue.lock().push_back(Scripted::Fail(message.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// The user-facing text of every call so far.
    pub fn user_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.role == MessageRole::User)
                    .map(|m| m.content.clone())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        _config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.prompts.lock().push(messages.to_vec());

        let next = self.queue.lock().pop_front();
        let content = match next {
            Some(Scripted::Reply(reply)) => reply,
            Some(Scripted::Fail(message)) => return Err(anyhow!(message)),
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| anyhow!("mock provider has no scripted reply"))?,
        };

        Ok(LLMResponse {
            content,
            total_tokens: None,
            prompt_tokens: None,
            completion_tokens: None,
            finish_reason: Some("stop".to_string()),
            model: "mock".to_string(),
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
