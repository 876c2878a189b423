//! Reflector — analyzes a failed step and proposes a fix, or gives up.
//!
//! Grounded in `original_source/agent/orchestrator/reflector.py`: one LLM
//! call per failure, low temperature, a rubric that forces
//! `is_retryable: false` for configuration/dependency errors a retry can't
//! fix, and a hard ban on placeholder values in any proposed fix.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::extractor;
use crate::core::provider::{GenerationOptions, LlmProvider};
use crate::core::types::Message;
use crate::model::{ReflectionVerdict, Step};

const SYSTEM_PROMPT: &str = "You are an expert debugger and agentic planner. \
Your goal is to fix failed automation steps. Respond ONLY with a JSON object.";

pub struct Reflector {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
}

impl Reflector {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, model: impl Into<String>) -> Self {
        Reflector {
            provider,
            model: model.into(),
        }
    }

    /// Analyze why `step` failed with `error_message` and decide whether a
    /// retry (possibly with a modified step) is worth attempting.
    pub async fn analyze_failure(
        &self,
        step: &Step,
        error_message: &str,
        context_summary: &str,
    ) -> ReflectionVerdict {
        let Some(provider) = &self.provider else {
            return ReflectionVerdict::non_retryable(
                "reflection disabled: no provider API key configured",
            );
        };

        let prompt = build_reflection_prompt(step, error_message, context_summary);
        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let options = GenerationOptions {
            model: Some(self.model.clone()),
            temperature: Some(0.1),
            max_tokens: Some(4000),
            ..Default::default()
        };

        let response = match provider.generate(&messages, &options).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "reflector: provider call failed");
                return ReflectionVerdict::non_retryable(format!("reflector error: {}", e));
            }
        };

        self.parse_verdict(&response.content)
    }

    fn parse_verdict(&self, content: &str) -> ReflectionVerdict {
        let value = match extractor::extract_object(content) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "reflector: could not parse response as JSON");
                return ReflectionVerdict::non_retryable(format!(
                    "could not parse reflector response: {}",
                    e
                ));
            }
        };

        let is_retryable = value
            .get("is_retryable")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let reason = value
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("No reason provided")
            .to_string();

        let modified_step_value = value.get("modified_step").cloned();
        let modified_step = match modified_step_value {
            Some(Value::Null) | None => None,
            Some(v) => {
                if extractor::contains_placeholder(&v) {
                    warn!("reflector: modified_step contains a forbidden placeholder, rejecting fix");
                    return ReflectionVerdict::non_retryable(format!(
                        "reflector proposed a fix containing a placeholder value; original reason: {}",
                        reason
                    ));
                }
                serde_json::from_value::<Step>(v).ok()
            }
        };

        if is_retryable && modified_step.is_none() {
            debug!("reflector: retryable with no modified step, retry as-is");
        }

        ReflectionVerdict {
            is_retryable,
            modified_step,
            reason,
        }
    }
}

fn build_reflection_prompt(step: &Step, error: &str, context: &str) -> String {
    let step_json = serde_json::to_string_pretty(step).unwrap_or_else(|_| "{}".to_string());
    format!(
        "The following agent step failed during execution.\n\
Please analyze the error and provide a fixed version of the step if possible.\n\n\
**Failed Step**:\n{step_json}\n\n\
**Error Message**:\n{error}\n\n\
**Context**:\n{context}\n\n\
**Instructions**:\n\
1. Analyze why the step failed (syntax error, missing file, invalid parameter).\n\
2. If the failure is in script content, rewrite the `script`/`code` parameter in `modified_step`.\n\
3. If a path was wrong, correct it using common conventions (e.g. `~/Desktop`).\n\
4. Return a JSON object shaped as:\n\
{{\"is_retryable\": boolean, \"reason\": \"string\", \"modified_step\": object|null}}\n\n\
**Non-retryable errors** (set is_retryable: false, modified_step: null): missing API key, \
missing native dependency the user must install, a provider/model mismatch (e.g. a \
vision-incapable model asked to do vision), or any fix that needs user configuration.\n\n\
**Forbidden in modified_step**: placeholder values such as `[REPLACE_WITH_ACTUAL_APP_NAME]`, \
`extract_from_context_or_ask_user`, any bracketed stand-in, or `TODO`/`FIXME`. If the real value \
cannot be extracted from Context, set is_retryable: false instead of guessing.\n\
Keep the step's `type` the same unless the tool itself was wrong."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflector() -> Reflector {
        Reflector::new(None, "test-model")
    }

    #[tokio::test]
    async fn no_provider_is_non_retryable() {
        let r = reflector();
        let step = Step::new("file_read", "read");
        let verdict = r.analyze_failure(&step, "boom", "").await;
        assert!(!verdict.is_retryable);
        assert!(verdict.modified_step.is_none());
    }

    #[test]
    fn parse_verdict_rejects_placeholder_fix() {
        let r = reflector();
        let raw = r#"{"is_retryable": true, "reason": "fixed path", "modified_step": {"type": "open_app", "action": "open", "params": {"app_name": "[REPLACE_WITH_ACTUAL_APP_NAME]"}}}"#;
        let verdict = r.parse_verdict(raw);
        assert!(!verdict.is_retryable);
    }

    #[test]
    fn parse_verdict_accepts_clean_fix() {
        let r = reflector();
        let raw = r#"{"is_retryable": true, "reason": "corrected path", "modified_step": {"type": "file_write", "action": "write", "params": {"path": "~/Desktop/out.txt"}}}"#;
        let verdict = r.parse_verdict(raw);
        assert!(verdict.is_retryable);
        assert_eq!(verdict.modified_step.unwrap().step_type, "file_write");
    }

    #[test]
    fn parse_verdict_tolerates_preamble_text() {
        let r = reflector();
        let raw = "Sure, here you go:\n{\"is_retryable\": false, \"reason\": \"missing API key\", \"modified_step\": null}\nThanks!";
        let verdict = r.parse_verdict(raw);
        assert!(!verdict.is_retryable);
        assert_eq!(verdict.reason, "missing API key");
    }
}
