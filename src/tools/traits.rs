//! Tool adapter dispatch contract, plus the user-input side-channel shared
//! adapters may need.
//!
//! Every registered step type is served by exactly one adapter behind a
//! single `execute(step, context) -> StepResult` method — the "dispatch
//! contract" (spec glossary). Adapters are constructed once at startup and
//! never invoked concurrently for the same task.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::executor::Emit;
use crate::model::{Context, Step, StepResult};

#[async_trait]
pub trait ToolAdapter: Send + Sync {
    async fn execute(&self, step: &Step, context: &mut Context) -> StepResult;
}

/// A blocking user-input prompt an adapter wants the host to show (spec.md
/// §4.8, §6.1's `request_input` event shape).
pub struct UserInputSpec {
    pub request_type: String,
    pub title: String,
    pub message: Option<String>,
    pub fields: Vec<Value>,
    pub captcha_image: Option<String>,
}

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Emits a `request_input` event and blocks (cooperatively — this only
/// parks the current task, not the runtime) until the host writes a
/// matching response to `config::user_input_response_path()`, emitting
/// periodic `waiting_for_input` heartbeats while it waits.
///
/// Grounded in `original_source/agent/user_input.py`'s
/// `UserInputManager._send_request_and_wait`: same event pair, same
/// UUID-keyed response file holding `{request_id, cancelled?, values?}`,
/// same 600s default timeout and ~5s heartbeat cadence. Returns `None` on
/// cancellation or timeout, `Some(values)` (possibly empty, e.g. QR login
/// confirmation) otherwise.
pub async fn request_input(emit: &Emit, spec: UserInputSpec) -> Option<HashMap<String, String>> {
    request_input_at(emit, spec, &crate::config::user_input_response_path()).await
}

/// Same as [`request_input`] but against an explicit response file path,
/// so tests don't need to race over a shared, process-global default.
async fn request_input_at(emit: &Emit, spec: UserInputSpec, response_path: &Path) -> Option<HashMap<String, String>> {
    let id = Uuid::new_v4().to_string();
    emit(
        "request_input",
        json!({
            "id": id,
            "type": spec.request_type,
            "title": spec.title,
            "message": spec.message,
            "fields": spec.fields,
            "captchaImage": spec.captcha_image,
        }),
    );

    let _ = std::fs::remove_file(response_path);

    let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    let started = Instant::now();
    let mut last_heartbeat = started;

    loop {
        if started.elapsed() >= timeout {
            warn!(request_id = %id, "user input request timed out");
            return None;
        }

        if last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
            let elapsed = started.elapsed().as_secs();
            emit(
                "waiting_for_input",
                json!({
                    "request_id": id,
                    "elapsed": elapsed,
                    "remaining": DEFAULT_TIMEOUT_SECS.saturating_sub(elapsed),
                }),
            );
            last_heartbeat = Instant::now();
        }

        if let Ok(contents) = std::fs::read_to_string(response_path) {
            match serde_json::from_str::<Value>(&contents) {
                Ok(response) if response.get("request_id").and_then(|v| v.as_str()) == Some(id.as_str()) => {
                    let _ = std::fs::remove_file(response_path);

                    if response.get("cancelled").and_then(|v| v.as_bool()).unwrap_or(false) {
                        info!(request_id = %id, "user input request cancelled");
                        return None;
                    }

                    let values = response
                        .get("values")
                        .and_then(|v| v.as_object())
                        .map(|obj| {
                            obj.iter()
                                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                                .collect()
                        })
                        .unwrap_or_default();
                    return Some(values);
                }
                // a response for a different (presumably stale) request — keep waiting for ours
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, path = %response_path.display(), "user input response file unreadable, retrying")
                }
            }
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_emit() -> (Arc<Emit>, Arc<Mutex<Vec<(String, Value)>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&events);
        let emit: Arc<Emit> = Arc::new(move |event_type, data| {
            recorded.lock().unwrap().push((event_type.to_string(), data));
        });
        (emit, events)
    }

    #[tokio::test]
    async fn request_input_returns_values_once_response_file_appears() {
        let response_path = std::env::temp_dir().join(format!("taskagent-uir-{}.json", Uuid::new_v4()));

        let (emit, events) = recording_emit();
        let spec = UserInputSpec {
            request_type: "login".to_string(),
            title: "Log in".to_string(),
            message: None,
            fields: vec![json!({"name": "username", "label": "Username", "type": "text"})],
            captcha_image: None,
        };

        let path_for_task = response_path.clone();
        let handle = tokio::spawn(async move { request_input_at(&emit, spec, &path_for_task).await });

        // give the waiting task a moment to emit `request_input` and start polling
        tokio::time::sleep(Duration::from_millis(50)).await;
        let request_id = {
            let events = events.lock().unwrap();
            let (event_type, data) = events.first().expect("request_input event was emitted");
            assert_eq!(event_type, "request_input");
            data.get("id").and_then(|v| v.as_str()).unwrap().to_string()
        };

        std::fs::write(
            &response_path,
            json!({"request_id": request_id, "values": {"username": "alice"}}).to_string(),
        )
        .unwrap();

        let result = handle.await.unwrap();
        assert_eq!(result.unwrap().get("username").map(String::as_str), Some("alice"));

        let _ = std::fs::remove_file(&response_path);
    }

    #[tokio::test]
    async fn request_input_returns_none_on_cancellation() {
        let response_path = std::env::temp_dir().join(format!("taskagent-uir-cancel-{}.json", Uuid::new_v4()));

        let (emit, events) = recording_emit();
        let spec = UserInputSpec {
            request_type: "captcha".to_string(),
            title: "Enter captcha".to_string(),
            message: None,
            fields: vec![json!({"name": "captcha", "label": "Captcha", "type": "text"})],
            captcha_image: Some("base64data".to_string()),
        };

        let path_for_task = response_path.clone();
        let handle = tokio::spawn(async move { request_input_at(&emit, spec, &path_for_task).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let request_id = {
            let events = events.lock().unwrap();
            events.first().unwrap().1.get("id").and_then(|v| v.as_str()).unwrap().to_string()
        };

        std::fs::write(&response_path, json!({"request_id": request_id, "cancelled": true}).to_string()).unwrap();

        let result = handle.await.unwrap();
        assert!(result.is_none());

        let _ = std::fs::remove_file(&response_path);
    }
}
