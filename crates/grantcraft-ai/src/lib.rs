pub mod critique;
pub mod json;
pub mod llm_factory;
pub mod llm_provider;
pub mod mock;
pub mod prompts;
pub mod writing;

// Cloud LLM providers
#[cfg(feature = "anthropic")]
pub mod anthropic_provider;
#[cfg(feature = "openai-llm")]
pub mod openai_provider;

pub use critique::{Critique, CritiqueRequest, CritiqueService};
pub use json::extract_json;
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use mock::MockProvider;
pub use writing::{LetterKind, RewriteGoal, WritingService};
