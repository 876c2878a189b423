//! System adapters — clipboard, notifications, process spawn/close, and
//! sandboxed Python execution.
//!
//! Anything that would require simulated keyboard/mouse input, screen
//! capture, or text-to-speech is left as an honest
//! `StepResult::requires_user_action` rather than faked: none of those have
//! a backing crate in this workspace.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::SandboxConfig;
use crate::model::{Context, Step, StepResult};
use crate::sandbox::{self, CodeExecutor, ExecutionRequest, Language, OsSandbox, ScriptValidator};
use crate::tools::traits::ToolAdapter;

/// `clipboard_read` / `clipboard_write`.
pub struct ClipboardAdapter;

#[async_trait]
impl ToolAdapter for ClipboardAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        let mut clipboard = match arboard::Clipboard::new() {
            Ok(c) => c,
            Err(e) => return StepResult::failure(format!("clipboard unavailable: {}", e)),
        };

        match step.step_type.as_str() {
            "clipboard_read" => match clipboard.get_text() {
                Ok(text) => {
                    let mut result = StepResult::success("read clipboard");
                    result.data = Some(crate::model::StepResultData {
                        extra: [("text".to_string(), Value::String(text))].into(),
                        ..Default::default()
                    });
                    result
                }
                Err(e) => StepResult::failure(format!("clipboard read failed: {}", e)),
            },
            "clipboard_write" => {
                let Some(text) = step.params.get("text").and_then(Value::as_str) else {
                    return StepResult::failure("clipboard_write: missing 'text' parameter");
                };
                match clipboard.set_text(text.to_string()) {
                    Ok(()) => StepResult::success("wrote clipboard"),
                    Err(e) => StepResult::failure(format!("clipboard write failed: {}", e)),
                }
            }
            other => StepResult::failure(format!("clipboard adapter: unsupported type {}", other)),
        }
    }
}

/// `send_notification`.
pub struct NotificationAdapter;

#[async_trait]
impl ToolAdapter for NotificationAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        let title = step.params.get("title").and_then(Value::as_str).unwrap_or("TaskAgent");
        let body = step.params.get("body").and_then(Value::as_str).unwrap_or("");

        match notify_rust::Notification::new().summary(title).body(body).show() {
            Ok(_) => StepResult::success(format!("showed notification '{}'", title)),
            Err(e) => StepResult::failure(format!("notification failed: {}", e)),
        }
    }
}

/// `open_app` / `close_app` / `open_file` / `open_folder`.
pub struct ProcessAdapter;

#[async_trait]
impl ToolAdapter for ProcessAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        match step.step_type.as_str() {
            "open_app" => self.open_app(step),
            "close_app" => self.close_app(step),
            "open_file" | "open_folder" => self.open_path(step),
            other => StepResult::failure(format!("process adapter: unsupported type {}", other)),
        }
    }
}

impl ProcessAdapter {
    fn open_app(&self, step: &Step) -> StepResult {
        let Some(app_name) = step.params.get("app_name").and_then(Value::as_str) else {
            return StepResult::failure("open_app: missing 'app_name' parameter");
        };

        let spawn_result = if cfg!(target_os = "macos") {
            Command::new("open").arg("-a").arg(app_name).spawn()
        } else if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", "start", "", app_name]).spawn()
        } else {
            Command::new(app_name).spawn()
        };

        match spawn_result {
            Ok(_) => StepResult::success(format!("launched {}", app_name)),
            Err(e) => StepResult::failure(format!("could not launch {}: {}", app_name, e)),
        }
    }

    fn close_app(&self, step: &Step) -> StepResult {
        let Some(app_name) = step.params.get("app_name").and_then(Value::as_str) else {
            return StepResult::failure("close_app: missing 'app_name' parameter");
        };

        let kill_result = if cfg!(target_os = "windows") {
            Command::new("taskkill").args(["/IM", &format!("{}.exe", app_name), "/F"]).status()
        } else {
            Command::new("pkill").arg("-f").arg(app_name).status()
        };

        match kill_result {
            Ok(status) if status.success() => StepResult::success(format!("closed {}", app_name)),
            Ok(_) => StepResult::failure(format!("{} does not appear to be running", app_name)),
            Err(e) => StepResult::failure(format!("could not close {}: {}", app_name, e)),
        }
    }

    fn open_path(&self, step: &Step) -> StepResult {
        let Some(path) = step.params.get("path").and_then(Value::as_str) else {
            return StepResult::failure("open_file/open_folder: missing 'path' parameter");
        };

        let spawn_result = if cfg!(target_os = "macos") {
            Command::new("open").arg(path).spawn()
        } else if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", "start", "", path]).spawn()
        } else {
            Command::new("xdg-open").arg(path).spawn()
        };

        match spawn_result {
            Ok(_) => StepResult::success(format!("opened {}", path)),
            Err(e) => StepResult::failure(format!("could not open {}: {}", path, e)),
        }
    }
}

/// `get_system_info`.
pub struct SystemInfoAdapter;

#[async_trait]
impl ToolAdapter for SystemInfoAdapter {
    async fn execute(&self, _step: &Step, _context: &mut Context) -> StepResult {
        let info = json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "cpu_count": std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        });

        let mut result = StepResult::success("collected system info");
        result.data = Some(crate::model::StepResultData {
            extra: [("system_info".to_string(), info)].into(),
            ..Default::default()
        });
        result
    }
}

/// `execute_python_script` — dry-run lint/validate under a restricted
/// sandbox, then real execution under the configured environment.
pub struct PythonScriptAdapter {
    dry_run_executor: Box<dyn CodeExecutor>,
    real_executor: Box<dyn CodeExecutor>,
    validator: ScriptValidator,
    timeout: Duration,
}

impl PythonScriptAdapter {
    pub async fn new(config: &SandboxConfig) -> crate::error::Result<Self> {
        let dry_run_executor: Box<dyn CodeExecutor> = Box::new(OsSandbox::new(config.allowed_dir.clone()));
        let real_executor = sandbox::create_executor(config).await?;
        Ok(PythonScriptAdapter {
            dry_run_executor,
            real_executor,
            validator: ScriptValidator::new(config.dry_run_timeout_secs),
            timeout: Duration::from_secs(config.default_timeout_secs),
        })
    }
}

#[async_trait]
impl ToolAdapter for PythonScriptAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        let Some(code) = step.params.get("code").and_then(Value::as_str) else {
            return StepResult::failure("execute_python_script: missing 'code' parameter");
        };

        let report = match self
            .validator
            .validate(code, self.dry_run_executor.as_ref(), false, true)
            .await
        {
            Ok(r) => r,
            Err(e) => return StepResult::failure(format!("script validation error: {}", e)),
        };

        if !report.ok {
            warn!(reason = %report.message, "execute_python_script: validation rejected the script");
            return StepResult::failure(format!("{}: {}", report.message, report.details));
        }

        let request = ExecutionRequest::new(code, Language::Python).with_timeout(self.timeout);
        match self.real_executor.execute(request).await {
            Ok(result) if result.success => {
                let mut step_result = StepResult::success(result.stdout.clone());
                step_result.execution_time = Some(result.execution_time.as_secs_f64());
                step_result
            }
            Ok(result) => StepResult::failure(result.combined_output()),
            Err(e) => StepResult::failure(format!("script execution error: {}", e)),
        }
    }
}

/// Step types this workspace has no backing crate for: input simulation,
/// screen capture, volume/brightness control, text-to-speech, and the
/// Python-installer downloader. Reported honestly rather than faked.
pub struct UnsupportedAdapter {
    reason: &'static str,
}

impl UnsupportedAdapter {
    pub fn new(reason: &'static str) -> Self {
        UnsupportedAdapter { reason }
    }
}

#[async_trait]
impl ToolAdapter for UnsupportedAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        StepResult::requires_user_action(format!(
            "'{}' is not implemented on this host: {}",
            step.step_type, self.reason
        ))
    }
}

#[allow(dead_code)]
fn allowed_dir_default() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new("2026-07-27T00:00:00Z")
    }

    #[tokio::test]
    async fn system_info_reports_os_and_arch() {
        let adapter = SystemInfoAdapter;
        let step = Step::new("get_system_info", "check system info");
        let result = adapter.execute(&step, &mut ctx()).await;
        assert!(result.success);
        let info = result.data.unwrap().extra.get("system_info").cloned().unwrap();
        assert_eq!(info.get("os").and_then(Value::as_str), Some(std::env::consts::OS));
    }

    #[tokio::test]
    async fn unsupported_adapter_requests_user_action() {
        let adapter = UnsupportedAdapter::new("no input-simulation crate in this workspace");
        let step = Step::new("mouse_click", "click somewhere");
        let result = adapter.execute(&step, &mut ctx()).await;
        assert!(!result.success);
        assert!(result.requires_user_action_flag());
    }
}
