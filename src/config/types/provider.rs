//! Provider configuration types
//!
//! Configuration for LLM providers. The recognized `provider` setting is a
//! closed set (`claude`, `openai`, `deepseek`, `grok`); anything else is
//! routed through `custom` as an OpenAI-compatible endpoint.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Selected provider (`claude`, `openai`, `deepseek`, `grok`, or a key in `custom`)
    #[serde(default = "default_provider")]
    pub default: String,
    /// Claude (Anthropic) configuration
    pub claude: Option<ClaudeConfig>,
    /// OpenAI configuration
    pub openai: Option<OpenAIConfig>,
    /// DeepSeek configuration
    pub deepseek: Option<DeepSeekConfig>,
    /// Grok (x.ai) configuration
    pub grok: Option<GrokConfig>,
    /// Custom OpenAI-compatible providers, keyed by provider id
    #[serde(default)]
    pub custom: HashMap<String, CustomProviderConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            default: default_provider(),
            claude: None,
            openai: None,
            deepseek: None,
            grok: None,
            custom: HashMap::new(),
        }
    }
}

fn default_provider() -> String {
    "claude".to_string()
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

/// Claude (Anthropic) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConfig {
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    #[serde(default = "default_claude_model")]
    pub default_model: String,
    #[serde(default = "default_claude_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_claude_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_claude_url() -> String {
    "https://api.anthropic.com".to_string()
}

/// OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    #[serde(default = "default_openai_model")]
    pub default_model: String,
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    pub organization: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// DeepSeek configuration (OpenAI-compatible wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepSeekConfig {
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    #[serde(default = "default_deepseek_model")]
    pub default_model: String,
    #[serde(default = "default_deepseek_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

fn default_deepseek_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

/// Grok (x.ai) configuration (OpenAI-compatible wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrokConfig {
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    #[serde(default = "default_grok_model")]
    pub default_model: String,
    #[serde(default = "default_grok_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_grok_model() -> String {
    "grok-2-latest".to_string()
}

fn default_grok_url() -> String {
    "https://api.x.ai/v1".to_string()
}

/// Custom OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomProviderConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    #[serde(skip_serializing, default)]
    pub api_key: Option<SecretString>,
    pub default_model: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Model failover configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailoverConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub fallback_models: Vec<String>,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
}

fn default_cooldown() -> u64 {
    300
}

fn default_max_failures() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_default() {
        let config = ProviderConfig::default();
        assert_eq!(config.default, "claude");
        assert!(config.claude.is_none());
    }
}
