//! LLM provider adapters
//!
//! Each vendor gets a thin `LlmProvider` implementation built on rig-core's
//! completion models, following the teacher's `rig_client.rs` wrapper
//! pattern. `deepseek` and `grok` are OpenAI-compatible wire formats, so
//! they share `OpenAiCompatibleProvider` with a different base URL.

mod anthropic;
mod openai_compatible;

pub use anthropic::ClaudeProvider;
pub use openai_compatible::OpenAiCompatibleProvider;

use std::sync::Arc;

use crate::config::Config;
use crate::core::LlmProvider;
use crate::error::{Error, Result};

/// Build the configured provider, selecting on `config.provider.default`.
pub fn build_provider(config: &Config) -> Result<Arc<dyn LlmProvider>> {
    match config.provider.default.as_str() {
        "claude" | "anthropic" => {
            let cfg = config.provider.claude.clone().ok_or_else(|| {
                Error::Config("provider=claude but provider.claude is not configured".to_string())
            })?;
            Ok(Arc::new(ClaudeProvider::new(cfg)?))
        }
        "openai" => {
            let cfg = config.provider.openai.clone().ok_or_else(|| {
                Error::Config("provider=openai but provider.openai is not configured".to_string())
            })?;
            Ok(Arc::new(OpenAiCompatibleProvider::openai(cfg)?))
        }
        "deepseek" => {
            let cfg = config.provider.deepseek.clone().ok_or_else(|| {
                Error::Config("provider=deepseek but provider.deepseek is not configured".to_string())
            })?;
            Ok(Arc::new(OpenAiCompatibleProvider::deepseek(cfg)?))
        }
        "grok" => {
            let cfg = config.provider.grok.clone().ok_or_else(|| {
                Error::Config("provider=grok but provider.grok is not configured".to_string())
            })?;
            Ok(Arc::new(OpenAiCompatibleProvider::grok(cfg)?))
        }
        other => {
            let cfg = config.provider.custom.get(other).cloned().ok_or_else(|| {
                Error::Config(format!(
                    "Unknown provider '{}': not one of claude, openai, deepseek, grok, and not \
                     present in provider.custom",
                    other
                ))
            })?;
            Ok(Arc::new(OpenAiCompatibleProvider::custom(cfg)?))
        }
    }
}
