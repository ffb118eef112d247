use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config as cfg;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;

const CONFIG_DIR_NAME: &str = ".grantcraft";
const ENV_PREFIX: &str = "GRANTCRAFT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, PDF uploads included.
    #[serde(default = "ServerConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    fn default_max_upload_bytes() -> usize {
        10 * 1024 * 1024
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            max_upload_bytes: Self::default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub require_auth: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Shared budget for every AI endpoint.
    #[serde(default = "SecurityConfig::default_ai_rate_limit")]
    pub ai_rate_limit_per_minute: u32,
}

impl SecurityConfig {
    fn default_ai_rate_limit() -> u32 {
        30
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            allowed_origins: Vec::new(),
            ai_rate_limit_per_minute: Self::default_ai_rate_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Openai,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: LlmProviderKind,
    #[serde(default = "LlmConfig::default_model")]
    pub model: String,
    #[serde(default = "LlmConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "LlmConfig::default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "LlmConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "LlmConfig::default_max_retries")]
    pub max_retries: u32,
    /// Overrides the provider's public endpoint (proxies, gateways).
    #[serde(default)]
    pub base_url: Option<String>,
}

impl LlmConfig {
    fn default_model() -> String {
        "gpt-4o-mini".to_string()
    }

    fn default_temperature() -> f32 {
        0.4
    }

    fn default_max_tokens() -> usize {
        2048
    }

    fn default_timeout_secs() -> u64 {
        60
    }

    fn default_max_retries() -> u32 {
        2
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LlmProviderKind::default(),
            model: Self::default_model(),
            temperature: Self::default_temperature(),
            max_tokens: Self::default_max_tokens(),
            timeout_secs: Self::default_timeout_secs(),
            max_retries: Self::default_max_retries(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    #[serde(default = "IntegrationsConfig::default_crossref_url")]
    pub crossref_url: String,
    #[serde(default = "IntegrationsConfig::default_grants_gov_url")]
    pub grants_gov_url: String,
    #[serde(default = "IntegrationsConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Contact address sent to Crossref's polite pool.
    #[serde(default)]
    pub mailto: Option<String>,
}

impl IntegrationsConfig {
    fn default_crossref_url() -> String {
        "https://api.crossref.org".to_string()
    }

    fn default_grants_gov_url() -> String {
        "https://api.grants.gov".to_string()
    }

    fn default_timeout_secs() -> u64 {
        15
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            crossref_url: Self::default_crossref_url(),
            grants_gov_url: Self::default_grants_gov_url(),
            timeout_secs: Self::default_timeout_secs(),
            mailto: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    // Never serialized; only read from config files or the environment.
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<SecretString>,
    #[serde(default, skip_serializing)]
    pub anthropic_api_key: Option<SecretString>,
    #[serde(default, skip_serializing)]
    pub jwt_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
            llm: LlmConfig::default(),
            integrations: IntegrationsConfig::default(),
            secrets: SecretsConfig::default(),
        }
    }
}

impl Settings {
    pub fn default_env() -> String {
        env::var("APP_ENV")
            .ok()
            .or_else(|| env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.server.host.trim().is_empty(),
            "server.host cannot be empty"
        );
        anyhow::ensure!(self.server.port > 0, "server.port must be > 0");
        anyhow::ensure!(
            self.server.max_upload_bytes > 0,
            "server.max_upload_bytes must be > 0"
        );
        anyhow::ensure!(
            (0.0..=2.0).contains(&self.llm.temperature),
            "llm.temperature must be within 0..=2"
        );
        anyhow::ensure!(
            self.security.ai_rate_limit_per_minute > 0,
            "security.ai_rate_limit_per_minute must be > 0"
        );
        if self.security.require_auth {
            let has_secret = self
                .secrets
                .jwt_secret
                .as_ref()
                .is_some_and(|s| !s.expose_secret().is_empty());
            anyhow::ensure!(
                has_secret,
                "secrets.jwt_secret is required when security.require_auth is enabled"
            );
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    settings: Settings,
    config_dir: PathBuf,
    env: String,
}

impl ConfigManager {
    /// Loads and validates settings from `config_dir` (or the default
    /// directory) for the given environment name.
    pub fn load(config_dir: Option<PathBuf>, env_override: Option<String>) -> Result<Self> {
        let env_name = env_override.unwrap_or_else(Settings::default_env);
        let config_dir = Self::get_config_dir(config_dir);
        let settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.validate()?;
        info!(env = %env_name, dir = ?config_dir, "configuration loaded");
        Ok(Self {
            settings,
            config_dir,
            env: env_name,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    /// Default configuration directory.
    ///
    /// Priority order:
    /// 1. ~/.grantcraft/
    /// 2. ./config/
    /// 3. Current directory
    pub fn default_config_dir() -> PathBuf {
        if let Some(home_dir) = dirs::home_dir() {
            let user_dir = home_dir.join(CONFIG_DIR_NAME);
            if user_dir.exists() {
                info!("Using config directory: {:?}", user_dir);
                return user_dir;
            }
        }

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            info!("Using config directory: {:?}", project_config);
            return project_config;
        }

        info!("Using config directory: {:?}", cwd);
        cwd
    }

    pub fn get_config_dir(custom_path: Option<PathBuf>) -> PathBuf {
        custom_path.unwrap_or_else(Self::default_config_dir)
    }

    /// Writes `default.toml` with the built-in defaults into `dir` unless one
    /// already exists. Secrets are never written.
    pub fn write_default(dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
        let path = dir.join("default.toml");
        if !path.exists() {
            let content =
                toml::to_string_pretty(&Settings::default()).context("serializing defaults")?;
            fs::write(&path, content).with_context(|| format!("writing {:?}", path))?;
            info!("Created default config: {:?}", path);
        }
        Ok(path)
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let mut builder = cfg::Config::builder();
        for stem in ["default", env_name] {
            for ext in ["toml", "yaml", "yml", "json"] {
                builder = builder.add_source(
                    cfg::File::from(config_dir.join(format!("{}.{}", stem, ext))).required(false),
                );
            }
        }
        let settings: Settings = builder
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(cfg::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert!(!settings.llm.enabled);
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn require_auth_needs_a_secret() {
        let mut settings = Settings::default();
        settings.security.require_auth = true;
        assert!(settings.validate().is_err());
        settings.secrets.jwt_secret = Some(SecretString::from("s3cret"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let mut settings = Settings::default();
        settings.llm.temperature = 3.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut settings = Settings::default();
        settings.secrets.openai_api_key = Some(SecretString::from("sk-test"));
        let rendered = toml::to_string(&settings).unwrap();
        assert!(!rendered.contains("sk-test"));
    }
}
