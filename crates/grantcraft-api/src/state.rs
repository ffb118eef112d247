use anyhow::Result;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use grantcraft_ai::{CritiqueService, GenerationConfig, LLMProvider, LLMProviderFactory, WritingService};
use grantcraft_core::Settings;
use jsonwebtoken::DecodingKey;
use secrecy::ExposeSecret;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{CrossrefVerifier, GrantSearch, GrantsGovClient, ReferenceVerifier};
use crate::store::{ApplicationStore, InMemoryStore};
use crate::{ApiError, ApiResult};

pub type AiRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn ApplicationStore>,
    pub llm: Option<Arc<dyn LLMProvider>>,
    pub verifier: Arc<dyn ReferenceVerifier>,
    pub grants: Arc<dyn GrantSearch>,
    /// Shared by every AI route.
    pub ai_limiter: Arc<AiRateLimiter>,
    pub jwt_key: Option<Arc<DecodingKey>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let llm = if settings.llm.enabled {
            match LLMProviderFactory::create_from_config(&settings.llm, &settings.secrets) {
                Ok(provider) => {
                    info!(
                        provider = provider.provider_name(),
                        model = provider.model_name(),
                        "LLM provider ready"
                    );
                    Some(provider)
                }
                Err(e) => {
                    warn!("LLM provider unavailable, AI routes will return 503: {:#}", e);
                    None
                }
            }
        } else {
            info!("LLM disabled in configuration");
            None
        };

        let verifier: Arc<dyn ReferenceVerifier> =
            Arc::new(CrossrefVerifier::new(&settings.integrations)?);
        let grants: Arc<dyn GrantSearch> = Arc::new(GrantsGovClient::new(&settings.integrations)?);

        let per_minute = NonZeroU32::new(settings.security.ai_rate_limit_per_minute)
            .unwrap_or(NonZeroU32::MIN);
        let ai_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        let jwt_key = settings
            .secrets
            .jwt_secret
            .as_ref()
            .map(|secret| Arc::new(DecodingKey::from_secret(secret.expose_secret().as_bytes())));

        Ok(Self {
            settings: Arc::new(settings),
            store: Arc::new(InMemoryStore::new()),
            llm,
            verifier,
            grants,
            ai_limiter,
            jwt_key,
        })
    }

    pub fn with_llm(mut self, llm: Option<Arc<dyn LLMProvider>>) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ApplicationStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn ReferenceVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_grant_search(mut self, grants: Arc<dyn GrantSearch>) -> Self {
        self.grants = grants;
        self
    }

    /// The provider for an AI route: 503 without one, 429 once the shared
    /// quota is spent.
    pub fn ai_provider(&self) -> ApiResult<Arc<dyn LLMProvider>> {
        let provider = self
            .llm
            .clone()
            .ok_or_else(|| ApiError::ServiceUnavailable("no LLM provider is configured".to_string()))?;
        self.ai_limiter.check().map_err(|_| ApiError::RateLimited)?;
        Ok(provider)
    }

    pub fn critique_service(&self) -> ApiResult<CritiqueService> {
        let config = GenerationConfig {
            temperature: 0.2,
            max_tokens: Some(self.settings.llm.max_tokens),
            ..GenerationConfig::default()
        }
        .json();
        Ok(CritiqueService::new(self.ai_provider()?).with_config(config))
    }

    pub fn writing_service(&self) -> ApiResult<WritingService> {
        let config = GenerationConfig {
            temperature: self.settings.llm.temperature,
            max_tokens: Some(self.settings.llm.max_tokens),
            ..GenerationConfig::default()
        };
        Ok(WritingService::new(self.ai_provider()?).with_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantcraft_ai::MockProvider;

    #[test]
    fn ai_provider_requires_configuration_then_quota() {
        let mut settings = Settings::default();
        settings.llm.enabled = false;
        settings.security.ai_rate_limit_per_minute = 2;
        let state = AppState::new(settings).unwrap();
        assert!(matches!(state.ai_provider(), Err(ApiError::ServiceUnavailable(_))));

        let state = state.with_llm(Some(Arc::new(MockProvider::always("ok"))));
        assert!(state.ai_provider().is_ok());
        assert!(state.ai_provider().is_ok());
        assert!(matches!(state.ai_provider(), Err(ApiError::RateLimited)));
    }

    #[test]
    fn jwt_key_follows_secret() {
        let state = AppState::new(Settings::default()).unwrap();
        assert!(state.jwt_key.is_none());

        let mut settings = Settings::default();
        settings.secrets.jwt_secret = Some("s3cret".to_string().into());
        assert!(AppState::new(settings).unwrap().jwt_key.is_some());
    }
}
