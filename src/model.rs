//! Shared data model for the orchestration and execution engine
//!
//! Types here are passed between the planner, reflector, plan executor, tool
//! registry, and both memory layers. None of them owns any I/O; they are
//! plain records, following the teacher's `agent::types`/`core::types`
//! pattern of keeping wire/data shapes free of behavior.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of step `type` values the tool registry accepts. Anything
/// else must be resolved by alias normalization or rejected.
pub const STEP_TYPES: &[&str] = &[
    // Browser
    "browser_navigate", "browser_click", "browser_fill", "browser_wait",
    "browser_check_element", "browser_screenshot", "download_file",
    "request_login", "request_qr_login", "request_captcha", "fill_login", "fill_captcha",
    // File
    "file_read", "file_write", "file_create", "file_delete", "file_rename",
    "file_move", "file_copy", "file_organize", "file_classify",
    "file_batch_rename", "file_batch_copy", "file_batch_organize", "list_files",
    // System
    "screenshot_desktop", "open_file", "open_folder", "open_app", "close_app",
    "set_volume", "set_brightness", "send_notification", "speak",
    "clipboard_read", "clipboard_write", "keyboard_type", "keyboard_shortcut",
    "mouse_click", "mouse_move", "window_minimize", "window_maximize", "window_close",
    "get_system_info", "image_process", "download_latest_python_installer",
    "execute_python_script", "text_process",
    // Email
    "send_email", "search_emails", "get_email_details", "download_attachments",
    "manage_emails", "compress_files",
    // Reminder/workflow/history
    "set_reminder", "list_reminders", "cancel_reminder", "create_workflow",
    "list_workflows", "delete_workflow", "get_task_history", "search_history",
    "add_favorite", "list_favorites", "remove_favorite",
];

/// True if `step_type` is in the registered closed set (pre-alias-normalization).
pub fn is_registered_step_type(step_type: &str) -> bool {
    STEP_TYPES.contains(&step_type)
}

/// Free-form instruction plus optional caller-supplied hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub text: String,
    #[serde(default)]
    pub hints: HashMap<String, Value>,
}

impl Instruction {
    pub fn new(text: impl Into<String>) -> Self {
        Instruction {
            text: text.into(),
            hints: HashMap::new(),
        }
    }
}

/// Per-task mutable context threaded through every step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub current_time: String,
    #[serde(default)]
    pub memory_context: String,
    #[serde(default)]
    pub file_context_buffer: Vec<String>,
    #[serde(default)]
    pub stop_flag: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Context {
    pub fn new(current_time: impl Into<String>) -> Self {
        Context {
            current_time: current_time.into(),
            memory_context: String::new(),
            file_context_buffer: Vec::new(),
            stop_flag: false,
            extra: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }

    /// A bounded summary used in reflector prompts; avoids dumping the whole
    /// file context buffer into every LLM call.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.memory_context.is_empty() {
            parts.push(format!("memory_context: {} chars", self.memory_context.len()));
        }
        if !self.file_context_buffer.is_empty() {
            parts.push(format!("{} cached file(s)", self.file_context_buffer.len()));
        }
        if parts.is_empty() {
            "no additional context".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// One unit of work dispatched to exactly one tool adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type")]
    pub step_type: String,
    pub action: String,
    #[serde(default)]
    pub params: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Step {
    pub fn new(step_type: impl Into<String>, action: impl Into<String>) -> Self {
        Step {
            step_type: step_type.into(),
            action: action.into(),
            params: HashMap::new(),
            description: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// True if `type`/`action` are non-empty, as required by the data model's
    /// invariants. Placeholder detection is a separate check (see
    /// `agent::extractor::contains_placeholder`).
    pub fn is_well_formed(&self) -> bool {
        !self.step_type.trim().is_empty() && !self.action.trim().is_empty()
    }
}

/// Finite ordered sequence of steps. An empty plan is legal.
pub type Plan = Vec<Step>;

/// Compact step retained only `{type, action, description}`, used for vector
/// memory persistence so stored JSON stays small and well-formed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactStep {
    #[serde(rename = "type")]
    pub step_type: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Step> for CompactStep {
    fn from(step: &Step) -> Self {
        CompactStep {
            step_type: step.step_type.clone(),
            action: step.action.clone(),
            description: step.description.clone(),
        }
    }
}

/// Outcome of one adapter invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StepResultData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installed_packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

/// Flags attached to `StepResult.data` that short-circuit the retry loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResultData {
    #[serde(default)]
    pub is_config_error: bool,
    #[serde(default)]
    pub requires_user_action: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl StepResult {
    pub fn success(message: impl Into<String>) -> Self {
        StepResult {
            success: true,
            message: message.into(),
            data: None,
            error: None,
            images: Vec::new(),
            installed_packages: Vec::new(),
            execution_time: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        StepResult {
            success: false,
            message: message.into(),
            data: None,
            error: None,
            images: Vec::new(),
            installed_packages: Vec::new(),
            execution_time: None,
        }
    }

    pub fn requires_user_action(message: impl Into<String>) -> Self {
        StepResult {
            success: false,
            message: message.into(),
            data: Some(StepResultData {
                requires_user_action: true,
                ..Default::default()
            }),
            error: None,
            images: Vec::new(),
            installed_packages: Vec::new(),
            execution_time: None,
        }
    }

    pub fn is_config_error(&self) -> bool {
        self.data.as_ref().map(|d| d.is_config_error).unwrap_or(false)
    }

    pub fn requires_user_action_flag(&self) -> bool {
        self.data.as_ref().map(|d| d.requires_user_action).unwrap_or(false)
    }
}

/// Verdict from one reflector invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionVerdict {
    pub is_retryable: bool,
    #[serde(default)]
    pub modified_step: Option<Step>,
    pub reason: String,
}

impl ReflectionVerdict {
    pub fn non_retryable(reason: impl Into<String>) -> Self {
        ReflectionVerdict {
            is_retryable: false,
            modified_step: None,
            reason: reason.into(),
        }
    }
}

/// Final outcome of one `execute` command, mirroring the `result` event's
/// `data` shape from the stdio protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub message: String,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepOutcome>>,
    pub user_instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

/// One step's result, paired with its index and the step that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub step: Step,
    pub result: StepResult,
}

/// Durable task record, written exactly once per completed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub instruction: String,
    pub steps: Vec<CompactStep>,
    pub success: bool,
    pub duration_s: f64,
    pub files_involved: Vec<String>,
    pub created_at: String,
}

/// Instruction pattern persisted in vector memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionPatternVector {
    pub id: String,
    pub instruction_text: String,
    pub compact_steps: Vec<CompactStep>,
    pub success: bool,
    pub duration_s: f64,
    pub files: Vec<String>,
    pub timestamp: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Conversation turn persisted in vector memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationVector {
    pub id: String,
    pub user_message: String,
    pub response_preview: String,
    pub session_id: String,
    #[serde(default)]
    pub emotion: Option<String>,
    pub success: bool,
    pub timestamp: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Outcome of the intent router's fast-path classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentMatch {
    pub intent_type: String,
    pub confidence: f32,
    pub metadata: IntentMetadata,
    pub is_fast_path: bool,
}

/// Per-intent metadata: enough to synthesize a single-step plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentMetadata {
    #[serde(rename = "type")]
    pub step_type: String,
    pub action: String,
    #[serde(default)]
    pub default_params: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_well_formed() {
        let step = Step::new("file_read", "read a file");
        assert!(step.is_well_formed());
        let empty = Step::new("", "x");
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn step_result_flags() {
        let r = StepResult::requires_user_action("no api key");
        assert!(!r.success);
        assert!(r.requires_user_action_flag());
        assert!(!r.is_config_error());
    }

    #[test]
    fn compact_step_drops_params() {
        let step = Step::new("file_delete", "delete").with_param("path", Value::String("x".into()));
        let compact = CompactStep::from(&step);
        assert_eq!(compact.step_type, "file_delete");
    }
}
