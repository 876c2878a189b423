//! OpenAI-compatible provider, shared by OpenAI, DeepSeek, Grok, and any
//! `provider.custom` entry — all speak the same chat-completions wire
//! format, so one rig-core client handles them with a different base URL.

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::providers::openai;
use secrecy::ExposeSecret;

use crate::config::{CustomProviderConfig, DeepSeekConfig, GrokConfig, OpenAIConfig};
use crate::core::provider::{
    GenerationOptions, LlmProvider, LlmResponse, LlmStream, ModelInfo, ProviderMeta, UsageStats,
};
use crate::core::types::{Message, Role};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: openai::Client,
    meta: ProviderMeta,
    default_model: String,
}

impl OpenAiCompatibleProvider {
    fn build(id: &str, name: &str, api_key: &str, base_url: &str, default_model: String) -> Result<Self> {
        let client = openai::Client::builder(api_key)
            .base_url(base_url)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create {} client: {}", name, e)))?;

        Ok(OpenAiCompatibleProvider {
            client,
            meta: ProviderMeta {
                id: id.to_string(),
                name: name.to_string(),
                description: format!("{} via an OpenAI-compatible wire format", name),
                base_url: base_url.to_string(),
                supports_streaming: true,
                supports_tools: true,
                supports_vision: id == "openai",
            },
            default_model,
        })
    }

    pub fn openai(config: OpenAIConfig) -> Result<Self> {
        Self::build(
            "openai",
            "OpenAI",
            config.api_key.expose_secret(),
            &config.base_url,
            config.default_model,
        )
    }

    pub fn deepseek(config: DeepSeekConfig) -> Result<Self> {
        Self::build(
            "deepseek",
            "DeepSeek",
            config.api_key.expose_secret(),
            &config.base_url,
            config.default_model,
        )
    }

    pub fn grok(config: GrokConfig) -> Result<Self> {
        Self::build(
            "grok",
            "Grok",
            config.api_key.expose_secret(),
            &config.base_url,
            config.default_model,
        )
    }

    pub fn custom(config: CustomProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .unwrap_or_default();
        Self::build(
            &config.id,
            &config.name,
            &api_key,
            &config.base_url,
            config.default_model,
        )
    }

    fn completion_model(&self, model: &str) -> openai::CompletionModel {
        self.client.completion_model(model)
    }

    fn to_rig_messages(messages: &[Message]) -> Vec<openai::completion::Message> {
        messages
            .iter()
            .map(|msg| match msg.role {
                Role::System => openai::completion::Message::system(&msg.content),
                Role::User => openai::completion::Message::user(&msg.content),
                Role::Assistant => openai::completion::Message::assistant(&msg.content),
                Role::Tool => openai::completion::Message::user(&msg.content),
            })
            .collect()
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn meta(&self) -> &ProviderMeta {
        &self.meta
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: self.default_model.clone(),
            name: self.default_model.clone(),
            description: None,
            context_length: None,
            input_price: None,
            output_price: None,
        }])
    }

    async fn generate(&self, messages: &[Message], options: &GenerationOptions) -> Result<LlmResponse> {
        let model = options.model.as_deref().unwrap_or(&self.default_model);
        let rig_messages = Self::to_rig_messages(messages);

        let mut request = self.completion_model(model).completion_request(rig_messages);
        if let Some(max_tokens) = options.max_tokens {
            request = request.max_tokens(max_tokens as u64);
        }
        if let Some(temperature) = options.temperature {
            request = request.temperature(temperature as f64);
        }
        if let Some(top_p) = options.top_p {
            request = request.top_p(top_p as f64);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Provider(format!("{} completion failed: {}", self.meta.name, e)))?;

        let content = response.choice.to_content();

        Ok(LlmResponse {
            id: format!("{}-{}", self.meta.id, uuid::Uuid::new_v4()),
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
        let model = options.model.as_deref().unwrap_or(&self.default_model);
        let rig_messages = Self::to_rig_messages(messages);

        let mut request = self.completion_model(model).completion_request(rig_messages);
        if let Some(max_tokens) = options.max_tokens {
            request = request.max_tokens(max_tokens as u64);
        }
        if let Some(temperature) = options.temperature {
            request = request.temperature(temperature as f64);
        }

        let stream = request
            .stream()
            .await
            .map_err(|e| Error::Provider(format!("{} streaming failed: {}", self.meta.name, e)))?;

        use futures::stream::StreamExt;
        let mapped = stream.map(|r| r.map_err(|e| Error::Provider(format!("Stream error: {}", e))));
        Ok(Box::pin(mapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_openai_provider_creation() {
        let config = OpenAIConfig {
            api_key: SecretString::from("test-key".to_string()),
            default_model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            organization: None,
            timeout_secs: 120,
            max_retries: 3,
        };

        let provider = OpenAiCompatibleProvider::openai(config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().default_model(), "gpt-4o");
    }

    #[test]
    fn test_deepseek_uses_distinct_base_url() {
        let config = DeepSeekConfig {
            api_key: SecretString::from("test-key".to_string()),
            default_model: "deepseek-chat".to_string(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        };

        let provider = OpenAiCompatibleProvider::deepseek(config).unwrap();
        assert_eq!(provider.meta().base_url, "https://api.deepseek.com/v1");
    }
}
