//! Service Loop — the stdio protocol binding the orchestrator to a host
//! process.
//!
//! Ported from `original_source/agent/server.py`: read line-delimited JSON
//! commands from stdin, run them sequentially against one
//! [`TaskOrchestrator`], write line-delimited JSON events to stdout.
//! Nothing but the protocol touches stdout; logs go to stderr (wired by the
//! binary before this loop starts). Exactly one `result` event is emitted
//! per `execute` command, even if the task panics internally.

use std::io::Write;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use futures::FutureExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

use crate::agent::executor::Emit;
use crate::agent::orchestrator::TaskOrchestrator;
use crate::model::{Context, Instruction};

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Command {
    Execute {
        id: Value,
        instruction: String,
        #[serde(default)]
        context: Option<Value>,
    },
    Ping {
        id: Value,
    },
    Shutdown {
        id: Value,
    },
}

/// Builds the lifecycle-event emitter shared by the plan executor and the
/// task orchestrator. The task id is threaded through a shared cell rather
/// than a parameter because `Emit` is a plain synchronous callback
/// (`Fn(&str, Value)`); the service sets the cell before each `execute` and
/// clears it after, which is sound because commands are processed strictly
/// sequentially (spec.md §4.1).
pub fn event_emitter(current_task_id: Arc<StdMutex<Option<Value>>>) -> Arc<Emit> {
    Arc::new(move |event_type: &str, data: Value| {
        let id = current_task_id.lock().unwrap().clone();
        write_event(event_type, id, Some(data));
    })
}

pub struct Service {
    orchestrator: Arc<TaskOrchestrator>,
    current_task_id: Arc<StdMutex<Option<Value>>>,
}

impl Service {
    pub fn new(orchestrator: Arc<TaskOrchestrator>, current_task_id: Arc<StdMutex<Option<Value>>>) -> Self {
        Service { orchestrator, current_task_id }
    }

    /// Run the loop to completion: emits `ready`, processes stdin lines one
    /// at a time until `shutdown` or EOF, then returns.
    pub async fn run(&self, startup_started: Instant) {
        write_ready(startup_started.elapsed().as_secs_f64());

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "service: failed to read stdin line");
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Command>(trimmed) {
                Ok(Command::Execute { id, instruction, context }) => {
                    self.handle_execute(id, instruction, context).await;
                }
                Ok(Command::Ping { id }) => write_pong(id),
                Ok(Command::Shutdown { id }) => {
                    write_shutdown_ack(id);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, line = %trimmed, "service: malformed command");
                    write_error(None, format!("malformed command: {}", e));
                }
            }
        }
    }

    async fn handle_execute(&self, id: Value, instruction: String, context: Option<Value>) {
        *self.current_task_id.lock().unwrap() = Some(id.clone());
        let base_context = context.and_then(|c| serde_json::from_value::<Context>(c).ok());

        let outcome = std::panic::AssertUnwindSafe(
            self.orchestrator.run(&Instruction::new(instruction), base_context),
        )
        .catch_unwind()
        .await;

        *self.current_task_id.lock().unwrap() = None;

        match outcome {
            Ok(task_result) => write_result(id, json!(task_result)),
            Err(_) => write_result(
                id,
                json!({
                    "success": false,
                    "message": "internal error: task execution panicked",
                    "duration": 0.0,
                    "mode": Value::Null,
                    "steps": Value::Null,
                    "user_instruction": Value::Null,
                    "fallback": Value::Null,
                }),
            ),
        }
    }
}

fn write_ready(startup_time: f64) {
    write_line(json!({"type": "ready", "timestamp": epoch_seconds(), "startup_time": startup_time}));
}

fn write_pong(id: Value) {
    write_line(json!({"type": "pong", "id": id, "timestamp": epoch_seconds()}));
}

fn write_shutdown_ack(id: Value) {
    write_line(json!({"type": "shutdown_ack", "id": id, "timestamp": epoch_seconds()}));
}

fn write_error(id: Option<Value>, message: String) {
    let mut envelope = json!({"type": "error", "message": message});
    if let Some(id) = id {
        envelope["id"] = id;
    }
    write_line(envelope);
}

fn write_result(id: Value, data: Value) {
    write_line(json!({"type": "result", "id": id, "timestamp": epoch_seconds(), "data": data}));
}

fn write_event(event_type: &str, id: Option<Value>, data: Option<Value>) {
    let mut envelope = json!({"type": event_type, "timestamp": epoch_seconds()});
    if let Some(id) = id {
        envelope["id"] = id;
    }
    if let Some(data) = data {
        envelope["data"] = data;
    }
    write_line(envelope);
}

fn write_line(envelope: Value) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", envelope) {
        error!(error = %e, "service: failed to write event");
    }
}

/// Seconds since the Unix epoch, as a float — spec.md §6.1's wire timestamp
/// format, not an RFC3339 string.
fn epoch_seconds() -> f64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_command_parses() {
        let cmd: Command =
            serde_json::from_str(r#"{"cmd":"execute","id":1,"instruction":"open safari"}"#).unwrap();
        assert!(matches!(cmd, Command::Execute { .. }));
    }

    #[test]
    fn ping_command_parses() {
        let cmd: Command = serde_json::from_str(r#"{"cmd":"ping","id":"abc"}"#).unwrap();
        assert!(matches!(cmd, Command::Ping { .. }));
    }

    #[test]
    fn unknown_command_fails_to_parse() {
        let result = serde_json::from_str::<Command>(r#"{"cmd":"bogus","id":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn execute_command_accepts_optional_context() {
        let cmd: Command = serde_json::from_str(
            r#"{"cmd":"execute","id":2,"instruction":"do it","context":{"current_time":"2026-07-27T00:00:00Z"}}"#,
        )
        .unwrap();
        match cmd {
            Command::Execute { context, .. } => assert!(context.is_some()),
            _ => panic!("expected Execute"),
        }
    }
}
