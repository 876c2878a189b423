//! Configuration types module
//!
//! Splits configuration into focused modules, following the teacher's
//! layout:
//! - types/mod.rs: core configuration types (Config, AgentConfig, EmailConfig)
//! - types/provider.rs: LLM provider configuration
//! - types/storage.rs: structured/vector memory configuration
//! - types/sandbox.rs: sandbox/execution configuration

pub mod provider;
pub mod sandbox;
pub mod storage;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main application configuration. Field set mirrors the closed set of
/// recognized settings: provider, model, api_key (nested under
/// `provider.<name>.api_key`), sandbox_path (`sandbox.allowed_dir`),
/// auto_confirm, log_level, and the email SMTP/IMAP quartet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Agent-level configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Provider configuration (claude/openai/deepseek/grok/custom)
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// Storage configuration (structured + vector memory)
    #[serde(default)]
    pub storage: storage::StorageConfig,

    /// Sandbox configuration
    #[serde(default)]
    pub sandbox: sandbox::SandboxConfig,

    /// Email configuration (SMTP send / IMAP read)
    #[serde(default)]
    pub email: EmailConfig,

    /// Plugin/adapter configurations, opaque to the engine
    #[serde(default)]
    pub plugins: HashMap<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            agent: AgentConfig::default(),
            provider: provider::ProviderConfig::default(),
            storage: storage::StorageConfig::default(),
            sandbox: sandbox::SandboxConfig::default(),
            email: EmailConfig::default(),
            plugins: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to environment
    /// variables. Backward-compatible entry point matching the teacher's
    /// `from_env()` convention.
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Agent-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Default model to use (overrides the selected provider's default_model)
    pub model: Option<String>,
    /// Agent workspace directory
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    /// System prompt file
    pub system_prompt_file: Option<PathBuf>,
    /// Maximum context tokens assembled for a single planner/reflector call
    #[serde(default = "default_max_context")]
    pub max_context_tokens: u32,
    /// Default thinking level (ambient, provider-specific hint)
    #[serde(default)]
    pub thinking_level: ThinkingLevel,
    /// Enable verbose stderr logging
    #[serde(default)]
    pub verbose: bool,
    /// Skip interactive confirmation before executing destructive steps
    #[serde(default)]
    pub auto_confirm: bool,
    /// tracing-subscriber filter directive, e.g. "info" or "taskagent=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            model: None,
            workspace: default_workspace(),
            system_prompt_file: None,
            max_context_tokens: default_max_context(),
            thinking_level: ThinkingLevel::default(),
            verbose: false,
            auto_confirm: false,
            log_level: default_log_level(),
        }
    }
}

fn default_workspace() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".taskagent").join("workspace"))
        .unwrap_or_else(|| PathBuf::from("./workspace"))
}

fn default_max_context() -> u32 {
    200_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Thinking/reasoning level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    Off,
    Minimal,
    Low,
    #[default]
    Medium,
    High,
    XHigh,
}

/// Email configuration: outbound SMTP and inbound IMAP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    #[serde(skip_serializing, default)]
    pub smtp_password: Option<SecretString>,
    pub imap_host: Option<String>,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    pub imap_user: Option<String>,
    #[serde(skip_serializing, default)]
    pub imap_password: Option<SecretString>,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_imap_port() -> u16 {
    993
}

impl EmailConfig {
    /// True once enough of the SMTP quartet is present to attempt a send.
    pub fn smtp_configured(&self) -> bool {
        self.smtp_host.is_some() && self.smtp_user.is_some() && self.smtp_password.is_some()
    }

    /// True once enough of the IMAP quartet is present to attempt a read.
    pub fn imap_configured(&self) -> bool {
        self.imap_host.is_some() && self.imap_user.is_some() && self.imap_password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agent.log_level, "info");
        assert!(!config.agent.auto_confirm);
    }

    #[test]
    fn test_email_config_unconfigured_by_default() {
        let config = EmailConfig::default();
        assert!(!config.smtp_configured());
        assert!(!config.imap_configured());
    }
}
