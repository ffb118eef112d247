use crate::llm_provider::*;
use anyhow::{anyhow, Result};
use grantcraft_core::{LlmConfig, LlmProviderKind, SecretsConfig};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

#[cfg(feature = "anthropic")]
use crate::anthropic_provider::{AnthropicConfig, AnthropicProvider};

#[cfg(feature = "openai-llm")]
use crate::openai_provider::{OpenAIConfig, OpenAIProvider};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(
        config: &LlmConfig,
        secrets: &SecretsConfig,
    ) -> Result<Arc<dyn LLMProvider>> {
        if !config.enabled {
            return Err(anyhow!("LLM is not enabled in configuration"));
        }

        match config.provider {
            #[cfg(feature = "anthropic")]
            LlmProviderKind::Anthropic => Self::create_anthropic_provider(config, secrets),
            #[cfg(feature = "openai-llm")]
            LlmProviderKind::Openai => Self::create_openai_provider(config, secrets),
            #[allow(unreachable_patterns)]
            other => Err(anyhow!(
                "LLM provider {:?} is not compiled in. Rebuild with the matching feature enabled.",
                other
            )),
        }
    }

    /// Key from the secrets section, else the provider's conventional env var.
    fn api_key(secret: Option<&SecretString>, env_var: &str) -> Option<String> {
        secret
            .map(|s| s.expose_secret().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var(env_var).ok().filter(|s| !s.is_empty()))
    }

    #[cfg(feature = "anthropic")]
    fn create_anthropic_provider(
        config: &LlmConfig,
        secrets: &SecretsConfig,
    ) -> Result<Arc<dyn LLMProvider>> {
        let api_key = Self::api_key(secrets.anthropic_api_key.as_ref(), "ANTHROPIC_API_KEY")
            .ok_or_else(|| {
                anyhow!(
                    "Anthropic API key not found. Set 'secrets.anthropic_api_key' in config \
                     or ANTHROPIC_API_KEY environment variable"
                )
            })?;

        let defaults = AnthropicConfig::default();
        let anthropic_config = AnthropicConfig {
            api_key,
            base_url: config.base_url.clone().unwrap_or(defaults.base_url),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        };

        tracing::info!(model = %anthropic_config.model, "Using Anthropic LLM provider");
        Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
    }

    #[cfg(feature = "openai-llm")]
    fn create_openai_provider(
        config: &LlmConfig,
        secrets: &SecretsConfig,
    ) -> Result<Arc<dyn LLMProvider>> {
        let api_key = Self::api_key(secrets.openai_api_key.as_ref(), "OPENAI_API_KEY")
            .ok_or_else(|| {
                anyhow!(
                    "OpenAI API key not found. Set 'secrets.openai_api_key' in config \
                     or OPENAI_API_KEY environment variable"
                )
            })?;

        let defaults = OpenAIConfig::default();
        let openai_config = OpenAIConfig {
            api_key,
            base_url: config.base_url.clone().unwrap_or(defaults.base_url),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            organization: defaults.organization,
        };

        tracing::info!(model = %openai_config.model, "Using OpenAI LLM provider");
        Ok(Arc::new(OpenAIProvider::new(openai_config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_is_rejected() {
        let config = LlmConfig::default();
        assert!(LLMProviderFactory::create_from_config(&config, &SecretsConfig::default()).is_err());
    }

    #[cfg(feature = "anthropic")]
    #[test]
    fn builds_anthropic_from_secrets() {
        let config = LlmConfig {
            enabled: true,
            provider: LlmProviderKind::Anthropic,
            model: "claude-sonnet-4-5".to_string(),
            ..Default::default()
        };
        let secrets = SecretsConfig {
            anthropic_api_key: Some(SecretString::from("sk-ant-test")),
            ..Default::default()
        };
        let provider = LLMProviderFactory::create_from_config(&config, &secrets).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
        assert_eq!(provider.model_name(), "claude-sonnet-4-5");
    }

    #[cfg(feature = "openai-llm")]
    #[test]
    fn builds_openai_from_secrets() {
        let config = LlmConfig {
            enabled: true,
            ..Default::default()
        };
        let secrets = SecretsConfig {
            openai_api_key: Some(SecretString::from("sk-test")),
            ..Default::default()
        };
        let provider = LLMProviderFactory::create_from_config(&config, &secrets).unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }
}
