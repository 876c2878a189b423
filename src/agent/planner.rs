//! Planner — turns a natural-language instruction into an ordered [`Plan`].
//!
//! Grounded in `original_source/agent/planner/base_planner.py` and
//! `claude_planner.py`: inject `current_time`/memory context into the
//! prompt, call the model, tolerantly parse its JSON, validate and
//! auto-rewrite common mistakes, and retry once with a format-repair
//! prompt before giving up.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::agent::aliases;
use crate::agent::extractor;
use crate::core::provider::{GenerationOptions, LlmProvider};
use crate::core::types::Message;
use crate::error::{Error, Result};
use crate::model::{is_registered_step_type, Context, Instruction, Plan, Step, STEP_TYPES};

const FILE_OP_KEYWORDS: &[&str] = &["删除", "移动", "重命名", "复制", "delete", "move", "rename", "copy"];
const VAGUE_REFERENTS: &[&str] = &[
    "那个文件", "这个文件", "上一个", "最后一个", "刚才那个",
    "that file", "the last one", "the previous one",
];

pub struct Planner {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl Planner {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Planner {
            provider,
            model: model.into(),
        }
    }

    /// Produce a plan for `instruction`, retrying once via a format-repair
    /// prompt if the first response is unparsable or fails validation.
    pub async fn plan(&self, instruction: &Instruction, context: &Context) -> Result<Plan> {
        let grounding = grounding_step(&instruction.text, context);

        let (mut steps, invalid_reason) = match self.call_llm(instruction, context, None).await {
            Ok(steps) => {
                let (normalized, err) = normalize_and_validate(steps);
                (normalized, err)
            }
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

        if let Some(reason) = invalid_reason {
            warn!(reason = %reason, "planner: first attempt invalid, requesting format repair");
            steps = match self.call_llm(instruction, context, Some(&reason)).await {
                Ok(repaired) => {
                    let (normalized, err) = normalize_and_validate(repaired);
                    if let Some(reason2) = err {
                        return Err(Error::Planner(format!("Planning failed: {}", reason2)));
                    }
                    normalized
                }
                Err(e) => return Err(Error::Planner(format!("Planning failed: {}", e))),
            };
        }

        if let Some(g) = grounding {
            steps.insert(0, g);
        }

        postprocess(&mut steps, &instruction.text);
        Ok(steps)
    }

    async fn call_llm(
        &self,
        instruction: &Instruction,
        context: &Context,
        repair_reason: Option<&str>,
    ) -> Result<Vec<Step>> {
        let user_prompt = match repair_reason {
            None => build_user_prompt(instruction, context),
            Some(reason) => format!(
                "{}\n\nYour previous response could not be parsed or failed validation: {}. \
Reply again with ONLY a corrected JSON array of steps, no prose, no markdown fences.",
                build_user_prompt(instruction, context),
                reason
            ),
        };

        let messages = vec![Message::system(system_prompt()), Message::user(user_prompt)];
        let options = GenerationOptions {
            model: Some(self.model.clone()),
            temperature: Some(0.0),
            max_tokens: Some(4000),
            ..Default::default()
        };

        let response = self.provider.generate(&messages, &options).await?;
        extractor::extract_plan(&response.content)
    }
}

fn system_prompt() -> String {
    format!(
        "You are a task planner for a desktop automation agent. Given a user instruction, \
produce an ordered JSON array of steps. Each step is an object: \
{{\"type\": string, \"action\": string, \"params\": object, \"description\": string}}.\n\n\
`type` MUST be one of these registered step types:\n{}\n\n\
Rules:\n\
- Only perform operations the user explicitly asked for.\n\
- Never use placeholder values like `[REPLACE_WITH_ACTUAL_APP_NAME]`, `extract_from_context_or_ask_user`, \
or any bracketed stand-in. Extract real values from the instruction or context.\n\
- Reply with ONLY the JSON array, no prose, no markdown fences.",
        STEP_TYPES.join(", ")
    )
}

fn build_user_prompt(instruction: &Instruction, context: &Context) -> String {
    let mut prompt = format!(
        "Current time: {}\nUser instruction: {}",
        context.current_time, instruction.text
    );
    if !context.memory_context.is_empty() {
        prompt.push_str(&format!("\n\nRelevant memory:\n{}", context.memory_context));
    }
    if !context.file_context_buffer.is_empty() {
        prompt.push_str(&format!(
            "\n\nFiles currently in context: {}",
            context.file_context_buffer.join(", ")
        ));
    }
    prompt
}

/// Apply alias normalization, then check the closed-set/placeholder
/// invariants. Returns `(steps, Some(reason))` on the first violation found.
fn normalize_and_validate(mut steps: Vec<Step>) -> (Vec<Step>, Option<String>) {
    for step in steps.iter_mut() {
        let normalized = aliases::normalize_step_type(step);
        if normalized != step.step_type {
            step.step_type = normalized;
        }
    }

    for step in &steps {
        if !step.is_well_formed() {
            return (
                steps,
                Some(format!("step has an empty type or action: {:?}", step)),
            );
        }
        if !is_registered_step_type(&step.step_type) {
            return (
                steps,
                Some(format!("unregistered step type: {}", step.step_type)),
            );
        }
        let params_value = serde_json::to_value(&step.params).unwrap_or(Value::Null);
        if extractor::contains_placeholder(&params_value) {
            return (
                steps,
                Some(format!(
                    "step '{}' contains a placeholder value in params",
                    step.step_type
                )),
            );
        }
    }

    (steps, None)
}

/// If the instruction combines a file-operation keyword with a vague
/// referent, produce a `list_files` grounding step for position 0.
fn grounding_step(instruction_text: &str, context: &Context) -> Option<Step> {
    let lower = instruction_text.to_lowercase();
    let has_file_op = FILE_OP_KEYWORDS
        .iter()
        .any(|k| instruction_text.contains(k) || lower.contains(&k.to_lowercase()));
    let has_vague_referent = VAGUE_REFERENTS
        .iter()
        .any(|r| instruction_text.contains(r) || lower.contains(&r.to_lowercase()));

    if !has_file_op || !has_vague_referent {
        return None;
    }

    let directory = infer_directory(instruction_text, context);
    let mut step = Step::new("list_files", "resolve vague file reference");
    step.params.insert("directory".to_string(), Value::String(directory));
    Some(step)
}

fn infer_directory(instruction_text: &str, context: &Context) -> String {
    let lower = instruction_text.to_lowercase();
    if instruction_text.contains("桌面") || lower.contains("desktop") {
        return "~/Desktop".to_string();
    }
    if instruction_text.contains("下载") || lower.contains("download") {
        return "~/Downloads".to_string();
    }
    if let Some(Value::String(path)) = context.get("attached_path") {
        return path.clone();
    }
    "~/Desktop".to_string()
}

/// Tool-preference post-processing: screenshot steps whose instruction asks
/// to save to the desktop but omit `save_path` get one injected.
fn postprocess(steps: &mut [Step], instruction_text: &str) {
    let asks_to_save_to_desktop = instruction_text.contains("保存到桌面")
        || instruction_text.contains("保存桌面")
        || (instruction_text.contains("保存") && instruction_text.contains("桌面"))
        || instruction_text.to_lowercase().contains("save to desktop");

    if !asks_to_save_to_desktop {
        return;
    }

    for step in steps.iter_mut() {
        if step.step_type == "screenshot_desktop" && !step.params.contains_key("save_path") {
            step.params
                .insert("save_path".to_string(), Value::String("~/Desktop".to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounding_step_fires_on_vague_delete() {
        let ctx = Context::new("2026-07-27T00:00:00Z");
        let step = grounding_step("删除那个文件", &ctx);
        assert!(step.is_some());
        assert_eq!(step.unwrap().step_type, "list_files");
    }

    #[test]
    fn grounding_step_skipped_with_explicit_path() {
        let ctx = Context::new("2026-07-27T00:00:00Z");
        let step = grounding_step("delete ~/Desktop/report.txt", &ctx);
        assert!(step.is_none());
    }

    #[test]
    fn postprocess_injects_save_path() {
        let mut steps = vec![Step::new("screenshot_desktop", "take a screenshot")];
        postprocess(&mut steps, "截图桌面并保存到桌面");
        assert_eq!(
            steps[0].params.get("save_path").and_then(Value::as_str),
            Some("~/Desktop")
        );
    }

    #[test]
    fn postprocess_leaves_existing_save_path() {
        let mut steps = vec![
            Step::new("screenshot_desktop", "take a screenshot")
                .with_param("save_path", Value::String("~/Desktop/shot.png".into())),
        ];
        postprocess(&mut steps, "保存到桌面");
        assert_eq!(
            steps[0].params.get("save_path").and_then(Value::as_str),
            Some("~/Desktop/shot.png")
        );
    }

    #[test]
    fn normalize_and_validate_rejects_unregistered_type() {
        let steps = vec![Step::new("totally_made_up_type", "do a thing")];
        let (_, err) = normalize_and_validate(steps);
        assert!(err.is_some());
    }

    #[test]
    fn normalize_and_validate_rewrites_alias() {
        let steps = vec![Step::new("app_control", "关闭记事本")];
        let (normalized, err) = normalize_and_validate(steps);
        assert!(err.is_none());
        assert_eq!(normalized[0].step_type, "close_app");
    }

    #[test]
    fn normalize_and_validate_rejects_placeholder() {
        let steps = vec![
            Step::new("open_app", "open the app")
                .with_param("app_name", Value::String("[REPLACE_WITH_ACTUAL_APP_NAME]".into())),
        ];
        let (_, err) = normalize_and_validate(steps);
        assert!(err.is_some());
    }
}
