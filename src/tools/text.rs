//! `text_process` — translate/summarize/polish, backed by the configured
//! LLM provider. Mirrors `memory::summarizer::ConversationSummarizer`'s
//! shape (a thin prompt-building wrapper over `LlmProvider::generate`) but
//! has no naive fallback: these actions have no meaningful non-LLM
//! implementation, so a provider failure is reported as a failed step
//! rather than silently degraded.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::provider::{GenerationOptions, LlmProvider};
use crate::core::types::Message;
use crate::model::{Context, Step, StepResult, StepResultData};
use crate::tools::traits::ToolAdapter;
use std::sync::Arc;

pub struct TextProcessAdapter {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl TextProcessAdapter {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        TextProcessAdapter {
            provider,
            model: model.into(),
        }
    }

    fn build_prompt(action: &str, text: &str, target_lang: Option<&str>) -> Result<String, String> {
        match action {
            "translate" => {
                let lang = target_lang.unwrap_or("English");
                Ok(format!(
                    "Translate the following text to {}. Reply with only the translation, no commentary.\n\n{}",
                    lang, text
                ))
            }
            "summarize" => Ok(format!(
                "Summarize the following text concisely, preserving the key points. \
                 Reply with only the summary, no commentary.\n\n{}",
                text
            )),
            "polish" => Ok(format!(
                "Polish the following text: fix grammar, improve clarity, keep the original \
                 meaning and language. Reply with only the polished text, no commentary.\n\n{}",
                text
            )),
            other => Err(format!("text_process: unsupported action '{}'", other)),
        }
    }
}

#[async_trait]
impl ToolAdapter for TextProcessAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        let Some(text) = step.params.get("text").and_then(Value::as_str) else {
            return StepResult::failure("text_process: missing 'text' parameter");
        };
        if text.trim().is_empty() {
            return StepResult::failure("text_process: 'text' parameter was empty");
        }

        let target_lang = step.params.get("target_lang").and_then(Value::as_str);
        let prompt = match Self::build_prompt(&step.action, text, target_lang) {
            Ok(p) => p,
            Err(e) => return StepResult::failure(e),
        };

        let options = GenerationOptions {
            model: Some(self.model.clone()),
            max_tokens: Some(2048),
            temperature: Some(0.3),
            ..Default::default()
        };

        match self.provider.generate(&[Message::user(prompt)], &options).await {
            Ok(response) if !response.content.trim().is_empty() => {
                let content = response.content.trim().to_string();
                let mut result = StepResult::success(format!("{} completed", step.action));
                result.data = Some(StepResultData {
                    extra: [("result".to_string(), Value::String(content))].into(),
                    ..Default::default()
                });
                result
            }
            Ok(_) => StepResult::failure(format!("{}: provider returned an empty response", step.action)),
            Err(e) => StepResult::failure(format!("{} failed: {}", step.action, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_prompt_rejects_unknown_action() {
        assert!(TextProcessAdapter::build_prompt("shout", "hi", None).is_err());
    }

    #[test]
    fn build_prompt_translate_defaults_to_english() {
        let prompt = TextProcessAdapter::build_prompt("translate", "hola", None).unwrap();
        assert!(prompt.contains("English"));
        assert!(prompt.contains("hola"));
    }

    #[test]
    fn build_prompt_translate_honors_target_lang() {
        let prompt = TextProcessAdapter::build_prompt("translate", "hello", Some("Spanish")).unwrap();
        assert!(prompt.contains("Spanish"));
    }

    #[test]
    fn build_prompt_summarize_and_polish_are_distinct() {
        let summarize = TextProcessAdapter::build_prompt("summarize", "a long text", None).unwrap();
        let polish = TextProcessAdapter::build_prompt("polish", "a long text", None).unwrap();
        assert_ne!(summarize, polish);
    }
}
