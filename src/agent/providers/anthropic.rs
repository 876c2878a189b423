//! Claude (Anthropic) provider, built on rig-core's Anthropic completion model.

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::providers::anthropic;
use secrecy::ExposeSecret;

use crate::config::ClaudeConfig;
use crate::core::provider::{
    GenerationOptions, LlmProvider, LlmResponse, LlmStream, ModelInfo, ProviderMeta, UsageStats,
};
use crate::core::types::{Message, Role};
use crate::error::{Error, Result};

/// Claude provider wrapper
#[derive(Clone)]
pub struct ClaudeProvider {
    client: anthropic::Client,
    config: ClaudeConfig,
}

impl ClaudeProvider {
    pub fn new(config: ClaudeConfig) -> Result<Self> {
        let client = anthropic::Client::builder(config.api_key.expose_secret())
            .base_url(&config.base_url)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create Claude client: {}", e)))?;

        Ok(ClaudeProvider { client, config })
    }

    fn completion_model(&self, model: &str) -> anthropic::CompletionModel {
        self.client.completion_model(model)
    }

    fn to_rig_messages(messages: &[Message]) -> (Option<String>, Vec<anthropic::completion::Message>) {
        let mut system = None;
        let mut rig_messages = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    system = Some(match system.take() {
                        Some(existing) => format!("{}\n{}", existing, msg.content),
                        None => msg.content.clone(),
                    });
                }
                Role::User => rig_messages.push(anthropic::completion::Message::user(&msg.content)),
                Role::Assistant => rig_messages.push(anthropic::completion::Message::assistant(&msg.content)),
                Role::Tool => rig_messages.push(anthropic::completion::Message::user(&msg.content)),
            }
        }

        (system, rig_messages)
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    fn meta(&self) -> &ProviderMeta {
        static META: std::sync::OnceLock<ProviderMeta> = std::sync::OnceLock::new();
        META.get_or_init(|| ProviderMeta {
            id: "claude".to_string(),
            name: "Claude".to_string(),
            description: "Anthropic Claude via rig-core".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            supports_streaming: true,
            supports_tools: true,
            supports_vision: true,
        })
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![
            ModelInfo {
                id: "claude-opus-4-20250514".to_string(),
                name: "Claude Opus 4".to_string(),
                description: Some("Most capable Claude model".to_string()),
                context_length: Some(200_000),
                input_price: Some(15.0),
                output_price: Some(75.0),
            },
            ModelInfo {
                id: "claude-sonnet-4-20250514".to_string(),
                name: "Claude Sonnet 4".to_string(),
                description: Some("Balanced Claude model".to_string()),
                context_length: Some(200_000),
                input_price: Some(3.0),
                output_price: Some(15.0),
            },
        ])
    }

    async fn generate(&self, messages: &[Message], options: &GenerationOptions) -> Result<LlmResponse> {
        let model = options.model.as_deref().unwrap_or(&self.config.default_model);
        let (system, rig_messages) = Self::to_rig_messages(messages);

        let mut request = self.completion_model(model).completion_request(rig_messages);
        if let Some(system) = system {
            request = request.preamble(system);
        }
        if let Some(max_tokens) = options.max_tokens {
            request = request.max_tokens(max_tokens as u64);
        }
        if let Some(temperature) = options.temperature {
            request = request.temperature(temperature as f64);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Claude completion failed: {}", e)))?;

        let content = response.choice.to_content();

        Ok(LlmResponse {
            id: format!("claude-{}", uuid::Uuid::new_v4()),
            model: model.to_string(),
            content,
            finish_reason: Some("stop".to_string()),
            tool_calls: None,
            usage: Some(UsageStats {
                prompt_tokens: response.usage.input_tokens as u32,
                completion_tokens: response.usage.output_tokens as u32,
                total_tokens: response.usage.total_tokens as u32,
            }),
        })
    }

    async fn generate_stream(&self, messages: &[Message], options: &GenerationOptions) -> Result<LlmStream> {
        let model = options.model.as_deref().unwrap_or(&self.config.default_model);
        let (system, rig_messages) = Self::to_rig_messages(messages);

        let mut request = self.completion_model(model).completion_request(rig_messages);
        if let Some(system) = system {
            request = request.preamble(system);
        }
        if let Some(max_tokens) = options.max_tokens {
            request = request.max_tokens(max_tokens as u64);
        }
        if let Some(temperature) = options.temperature {
            request = request.temperature(temperature as f64);
        }

        let stream = request
            .stream()
            .await
            .map_err(|e| Error::Provider(format!("Claude streaming failed: {}", e)))?;

        use futures::stream::StreamExt;
        let mapped = stream.map(|r| r.map_err(|e| Error::Provider(format!("Stream error: {}", e))));
        Ok(Box::pin(mapped))
    }
}
