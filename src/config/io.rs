//! Configuration I/O - loading and saving configuration
//!
//! Recognized environment overrides mirror the recognized settings closed
//! set: provider, model, api_key (per-provider), sandbox_path, auto_confirm,
//! log_level, and the SMTP/IMAP quartet. A malformed config file is fatal
//! (`Error::Config`) and refuses startup rather than silently falling back
//! to defaults.

use std::path::Path;

use secrecy::SecretString;

use super::types::Config;
use crate::error::{Error, Result};

/// A snapshot of the configuration file, used by diagnostics/reload tooling.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub path: std::path::PathBuf,
    pub exists: bool,
    pub raw: Option<String>,
    pub config: Option<Config>,
    pub issues: Vec<String>,
}

/// Load configuration: file (if present) with environment overrides applied
/// on top, else environment-only.
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load configuration from a specific path. JSON5 and TOML are both
/// accepted; format is sniffed by extension, falling back to trying both.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "json" || ext == "json5") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else {
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides on top of an already-loaded config.
/// `.env` is loaded first (if present) so overrides work in both dev and
/// deployed contexts.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();

    if let Ok(provider) = std::env::var("TASKAGENT_PROVIDER") {
        config.provider.default = provider;
    }
    if let Ok(model) = std::env::var("TASKAGENT_MODEL") {
        config.agent.model = Some(model);
    }
    if let Ok(dir) = std::env::var("TASKAGENT_SANDBOX_PATH") {
        config.sandbox.allowed_dir = std::path::PathBuf::from(dir);
    }
    if let Ok(flag) = std::env::var("TASKAGENT_AUTO_CONFIRM") {
        config.agent.auto_confirm = flag == "1" || flag.eq_ignore_ascii_case("true");
    }
    if let Ok(level) = std::env::var("TASKAGENT_LOG_LEVEL") {
        config.agent.log_level = level;
    }

    apply_provider_api_key_overrides(config);
    apply_email_overrides(config);
}

fn apply_provider_api_key_overrides(config: &mut Config) {
    use super::types::provider::{ClaudeConfig, DeepSeekConfig, GrokConfig, OpenAIConfig};

    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        let entry = config.provider.claude.get_or_insert_with(|| ClaudeConfig {
            api_key: SecretString::from(String::new()),
            default_model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        });
        entry.api_key = SecretString::from(key);
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        let entry = config.provider.openai.get_or_insert_with(|| OpenAIConfig {
            api_key: SecretString::from(String::new()),
            default_model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            organization: None,
            timeout_secs: 120,
            max_retries: 3,
        });
        entry.api_key = SecretString::from(key);
    }
    if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
        let entry = config.provider.deepseek.get_or_insert_with(|| DeepSeekConfig {
            api_key: SecretString::from(String::new()),
            default_model: "deepseek-chat".to_string(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        });
        entry.api_key = SecretString::from(key);
    }
    if let Ok(key) = std::env::var("GROK_API_KEY").or_else(|_| std::env::var("XAI_API_KEY")) {
        let entry = config.provider.grok.get_or_insert_with(|| GrokConfig {
            api_key: SecretString::from(String::new()),
            default_model: "grok-2-latest".to_string(),
            base_url: "https://api.x.ai/v1".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        });
        entry.api_key = SecretString::from(key);
    }
}

fn apply_email_overrides(config: &mut Config) {
    if let Ok(host) = std::env::var("TASKAGENT_SMTP_HOST") {
        config.email.smtp_host = Some(host);
    }
    if let Ok(port) = std::env::var("TASKAGENT_SMTP_PORT") {
        if let Ok(port) = port.parse() {
            config.email.smtp_port = port;
        }
    }
    if let Ok(user) = std::env::var("TASKAGENT_SMTP_USER") {
        config.email.smtp_user = Some(user);
    }
    if let Ok(pw) = std::env::var("TASKAGENT_SMTP_PASSWORD") {
        config.email.smtp_password = Some(SecretString::from(pw));
    }
    if let Ok(host) = std::env::var("TASKAGENT_IMAP_HOST") {
        config.email.imap_host = Some(host);
    }
    if let Ok(port) = std::env::var("TASKAGENT_IMAP_PORT") {
        if let Ok(port) = port.parse() {
            config.email.imap_port = port;
        }
    }
    if let Ok(user) = std::env::var("TASKAGENT_IMAP_USER") {
        config.email.imap_user = Some(user);
    }
    if let Ok(pw) = std::env::var("TASKAGENT_IMAP_PASSWORD") {
        config.email.imap_password = Some(SecretString::from(pw));
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

/// Read a configuration file into a snapshot, used by the `ping`/reload path
/// to report parse errors without crashing the service loop.
#[allow(dead_code)]
pub fn read_config_snapshot(path: &Path) -> ConfigSnapshot {
    if !path.exists() {
        return ConfigSnapshot {
            path: path.to_path_buf(),
            exists: false,
            raw: None,
            config: None,
            issues: vec!["Configuration file does not exist".to_string()],
        };
    }

    let raw = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            return ConfigSnapshot {
                path: path.to_path_buf(),
                exists: true,
                raw: None,
                config: None,
                issues: vec![format!("Failed to read file: {}", e)],
            };
        }
    };

    let config = match load_config_from_path(path) {
        Ok(config) => Some(config),
        Err(e) => {
            return ConfigSnapshot {
                path: path.to_path_buf(),
                exists: true,
                raw: Some(raw),
                config: None,
                issues: vec![format!("Failed to parse config: {}", e)],
            };
        }
    };

    ConfigSnapshot {
        path: path.to_path_buf(),
        exists: true,
        raw: Some(raw),
        config,
        issues: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_config.json");

        let config = Config::default();
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.log_level, config.agent.log_level);
    }

    #[test]
    fn test_env_override_model() {
        std::env::set_var("TASKAGENT_MODEL", "claude-opus-4");
        let mut config = Config::default();
        apply_env_overrides(&mut config);
        assert_eq!(config.agent.model.as_deref(), Some("claude-opus-4"));
        std::env::remove_var("TASKAGENT_MODEL");
    }
}
