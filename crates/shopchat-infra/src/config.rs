//! Configuration loader for Shopchat.
//!
//! Reads `config.toml` from the data directory (`~/.shopchat/` in production)
//! and deserializes it into [`AppConfig`]. Falls back to defaults when the
//! file is missing or malformed, then layers environment overrides on top.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;

use shopchat_types::config::AppConfig;
use shopchat_types::error::ConfigError;

/// Environment variable holding the model API key.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Environment variable overriding the data directory.
pub const DATA_DIR_VAR: &str = "SHOPCHAT_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SHOPCHAT_DATA_DIR` environment variable
/// 2. `~/.shopchat`
/// 3. `./.shopchat` when no home directory is known
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_VAR) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".shopchat");
    }

    PathBuf::from(".shopchat")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or unparsable file: a warning, then the default.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<(), ConfigError> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using `lookup` as the variable source.
///
/// Empty values are ignored. A value that does not parse for a numeric
/// setting is an error rather than a silent fallback.
pub fn apply_overrides_from<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("MCP_SERVER_URL") {
        config.mcp_server_url = url;
    }
    if let Some(model) = get("SHOPCHAT_MODEL") {
        config.model = model;
    }
    if let Some(raw) = get("SHOPCHAT_MAX_TOKENS") {
        config.max_tokens = parse_var("SHOPCHAT_MAX_TOKENS", &raw)?;
    }
    if let Some(host) = get("SHOPCHAT_HOST") {
        config.host = host;
    }
    if let Some(raw) = get("SHOPCHAT_PORT") {
        config.port = parse_var("SHOPCHAT_PORT", &raw)?;
    }
    if let Some(level) = get("LOG_LEVEL") {
        config.log_level = level.to_lowercase();
    }

    Ok(())
}

fn parse_var<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

/// Read the model API key from `ANTHROPIC_API_KEY`.
pub fn api_key_from_env() -> Result<SecretString, ConfigError> {
    api_key_from(|key| std::env::var(key).ok())
}

fn api_key_from<F>(lookup: F) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(API_KEY_VAR)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
        .ok_or(ConfigError::Missing(API_KEY_VAR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
mcp_server_url = "http://search.internal:8000"
retention_days = 30

[turn]
progress_interval_ms = 1500
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.mcp_server_url, "http://search.internal:8000");
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.turn.progress_interval_ms, 1500);
        assert_eq!(config.port, 5000);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        apply_overrides_from(
            &mut config,
            env(&[
                ("MCP_SERVER_URL", "http://mcp:9000"),
                ("SHOPCHAT_MODEL", "claude-haiku-4-5"),
                ("SHOPCHAT_MAX_TOKENS", "2048"),
                ("SHOPCHAT_HOST", "127.0.0.1"),
                ("SHOPCHAT_PORT", " 8080 "),
                ("LOG_LEVEL", "DEBUG"),
            ]),
        )
        .unwrap();

        assert_eq!(config.mcp_server_url, "http://mcp:9000");
        assert_eq!(config.model, "claude-haiku-4-5");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn env_overrides_ignore_empty_values() {
        let mut config = AppConfig::default();
        apply_overrides_from(&mut config, env(&[("SHOPCHAT_MODEL", ""), ("SHOPCHAT_PORT", "  ")]))
            .unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn env_override_rejects_bad_port() {
        let mut config = AppConfig::default();
        let err = apply_overrides_from(&mut config, env(&[("SHOPCHAT_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SHOPCHAT_PORT", .. }));
    }

    #[test]
    fn api_key_required() {
        let err = api_key_from(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(API_KEY_VAR)));

        let err = api_key_from(env(&[(API_KEY_VAR, "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));

        let key = api_key_from(env(&[(API_KEY_VAR, "sk-ant-test")])).unwrap();
        assert_eq!(key.expose_secret(), "sk-ant-test");
    }
}
