use grantcraft_core::{ConfigManager, LlmProviderKind, Settings};
use secrecy::ExposeSecret;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_files_fall_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ConfigManager::load_from_sources(temp_dir.path(), "test").unwrap();
    assert_eq!(settings.server.port, 3000);
    assert_eq!(settings.integrations.crossref_url, "https://api.crossref.org");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_layered_files_override_in_order() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("default.toml"),
        r#"
[server]
host = "127.0.0.1"
port = 4000

[llm]
enabled = true
provider = "anthropic"
model = "claude-sonnet-4-5"
"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("staging.toml"),
        "[server]\nhost = \"127.0.0.1\"\nport = 5000\n",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("local.toml"),
        "[secrets]\nanthropic_api_key = \"sk-ant-local\"\n",
    )
    .unwrap();

    let settings = ConfigManager::load_from_sources(temp_dir.path(), "staging").unwrap();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 5000);
    assert!(settings.llm.enabled);
    assert_eq!(settings.llm.provider, LlmProviderKind::Anthropic);
    assert_eq!(settings.llm.model, "claude-sonnet-4-5");
    assert_eq!(
        settings
            .secrets
            .anthropic_api_key
            .as_ref()
            .map(|s| s.expose_secret().to_string()),
        Some("sk-ant-local".to_string())
    );
}

#[test]
fn test_environment_overrides() {
    let temp_dir = TempDir::new().unwrap();
    std::env::set_var("GRANTCRAFT__INTEGRATIONS__MAILTO", "grants@example.org");

    let settings = ConfigManager::load_from_sources(temp_dir.path(), "test").unwrap();
    assert_eq!(
        settings.integrations.mailto.as_deref(),
        Some("grants@example.org")
    );

    std::env::remove_var("GRANTCRAFT__INTEGRATIONS__MAILTO");
}

#[test]
fn test_invalid_settings_are_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("default.toml"),
        "[security]\nrequire_auth = true\n",
    )
    .unwrap();

    let result = ConfigManager::load(Some(temp_dir.path().to_path_buf()), Some("test".into()));
    assert!(result.is_err());
}

#[test]
fn test_write_default_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let path = ConfigManager::write_default(temp_dir.path()).unwrap();
    assert!(path.exists());

    let written = fs::read_to_string(&path).unwrap();
    let parsed: Settings = toml::from_str(&written).unwrap();
    assert_eq!(parsed.server.port, Settings::default().server.port);
    assert_eq!(
        parsed.security.ai_rate_limit_per_minute,
        Settings::default().security.ai_rate_limit_per_minute
    );

    let manager =
        ConfigManager::load(Some(temp_dir.path().to_path_buf()), Some("test".into())).unwrap();
    assert_eq!(manager.env(), "test");
    assert_eq!(manager.config_dir(), temp_dir.path());
}
