//! Reminder adapters — `set_reminder`, `list_reminders`, `cancel_reminder`.
//! Backed by the same local SQLite file as structured memory.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::model::{Context, Step, StepResult};
use crate::tools::store::SqliteStore;
use crate::tools::traits::ToolAdapter;

#[derive(Clone)]
pub struct ReminderAdapter {
    store: Arc<SqliteStore>,
}

impl ReminderAdapter {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        ReminderAdapter { store }
    }
}

#[async_trait]
impl ToolAdapter for ReminderAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        match step.step_type.as_str() {
            "set_reminder" => {
                let Some(text) = step.params.get("text").and_then(Value::as_str) else {
                    return StepResult::failure("set_reminder: missing 'text' parameter");
                };
                let Some(due_at) = step.params.get("due_at").and_then(Value::as_str) else {
                    return StepResult::failure("set_reminder: missing 'due_at' parameter");
                };
                match self.store.add_reminder(text, due_at) {
                    Ok(id) => {
                        let mut result = StepResult::success(format!("reminder set for {}", due_at));
                        result.data = Some(crate::model::StepResultData {
                            extra: [("reminder_id".to_string(), Value::String(id))].into(),
                            ..Default::default()
                        });
                        result
                    }
                    Err(e) => StepResult::failure(format!("set_reminder failed: {}", e)),
                }
            }
            "list_reminders" => match self.store.list_reminders() {
                Ok(rows) => {
                    let items: Vec<Value> = rows
                        .into_iter()
                        .map(|(id, text, due_at)| json!({"id": id, "text": text, "due_at": due_at}))
                        .collect();
                    let mut result = StepResult::success(format!("{} active reminder(s)", items.len()));
                    result.data = Some(crate::model::StepResultData {
                        extra: [("reminders".to_string(), json!(items))].into(),
                        ..Default::default()
                    });
                    result
                }
                Err(e) => StepResult::failure(format!("list_reminders failed: {}", e)),
            },
            "cancel_reminder" => {
                let Some(id) = step.params.get("reminder_id").and_then(Value::as_str) else {
                    return StepResult::failure("cancel_reminder: missing 'reminder_id' parameter");
                };
                match self.store.cancel_reminder(id) {
                    Ok(true) => StepResult::success(format!("cancelled reminder {}", id)),
                    Ok(false) => StepResult::failure(format!("no active reminder with id {}", id)),
                    Err(e) => StepResult::failure(format!("cancel_reminder failed: {}", e)),
                }
            }
            other => StepResult::failure(format!("reminder adapter: unsupported type {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn adapter() -> ReminderAdapter {
        let path = std::env::temp_dir().join(format!("taskagent-reminder-{}.db", Uuid::new_v4()));
        ReminderAdapter::new(Arc::new(SqliteStore::open(&path).unwrap()))
    }

    #[tokio::test]
    async fn set_then_list_then_cancel() {
        let adapter = adapter();
        let mut ctx = Context::new("2026-07-27T00:00:00Z");

        let set_step = Step::new("set_reminder", "remind me")
            .with_param("text", Value::String("call dentist".into()))
            .with_param("due_at", Value::String("2026-07-28T09:00:00Z".into()));
        let set_result = adapter.execute(&set_step, &mut ctx).await;
        assert!(set_result.success);
        let id = set_result
            .data
            .unwrap()
            .extra
            .get("reminder_id")
            .unwrap()
            .as_str()
            .unwrap()
            .to_string();

        let list_result = adapter.execute(&Step::new("list_reminders", "list"), &mut ctx).await;
        assert!(list_result.success);
        assert_eq!(
            list_result.data.unwrap().extra.get("reminders").unwrap().as_array().unwrap().len(),
            1
        );

        let cancel_step = Step::new("cancel_reminder", "cancel").with_param("reminder_id", Value::String(id));
        assert!(adapter.execute(&cancel_step, &mut ctx).await.success);
    }
}
