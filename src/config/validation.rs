//! Configuration validation
//!
//! Validates configuration and reports issues. Warnings never block
//! startup; errors do (a malformed/unusable config refuses startup per the
//! fatal `ConfigError` behavior).

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();
    result = validate_provider_config(config, result);
    result = validate_sandbox_config(config, result);
    result = validate_email_config(config, result);
    result
}

fn validate_provider_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let has_provider = config.provider.claude.is_some()
        || config.provider.openai.is_some()
        || config.provider.deepseek.is_some()
        || config.provider.grok.is_some()
        || !config.provider.custom.is_empty();

    if !has_provider {
        result = result.with_error(
            ValidationIssue::new(
                "provider",
                format!(
                    "No API key configured for the selected provider ({})",
                    config.provider.default
                ),
            )
            .with_suggestion("Set ANTHROPIC_API_KEY, OPENAI_API_KEY, DEEPSEEK_API_KEY, or GROK_API_KEY"),
        );
    }

    result
}

fn validate_sandbox_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if !config.sandbox.allowed_dir.exists() {
        result = result.with_warning(
            ValidationIssue::new(
                "sandbox.allowed_dir",
                format!(
                    "Sandbox directory does not exist: {}",
                    config.sandbox.allowed_dir.display()
                ),
            )
            .with_suggestion("Create the directory or change sandbox.allowed_dir"),
        );
    }

    result
}

fn validate_email_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if !config.email.smtp_configured() && !config.email.imap_configured() {
        result = result.with_warning(
            ValidationIssue::new(
                "email",
                "No SMTP/IMAP credentials configured. Email steps will report requires_user_action.",
            )
            .with_suggestion("Set TASKAGENT_SMTP_* and TASKAGENT_IMAP_* environment variables"),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config_has_no_provider() {
        let config = Config::default();
        let result = validate_config(&config);
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn test_validate_with_provider_configured() {
        use crate::config::types::provider::ClaudeConfig;
        use secrecy::SecretString;

        let mut config = Config::default();
        config.provider.claude = Some(ClaudeConfig {
            api_key: SecretString::from("test-key".to_string()),
            default_model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        });
        let result = validate_config(&config);
        assert!(result.errors.is_empty());
    }
}
