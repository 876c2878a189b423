//! History/favorites adapters — `get_task_history`, `search_history`,
//! `add_favorite`, `list_favorites`, `remove_favorite`. Thin wiring over
//! `tools::store::SqliteStore`'s `task_history`/`favorites` tables.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::model::{Context, Step, StepResult, StepResultData};
use crate::tools::store::SqliteStore;
use crate::tools::traits::ToolAdapter;

#[derive(Clone)]
pub struct HistoryAdapter {
    store: Arc<SqliteStore>,
}

impl HistoryAdapter {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        HistoryAdapter { store }
    }
}

fn history_rows_to_json(rows: Vec<(String, String, bool, String)>) -> Vec<Value> {
    rows.into_iter()
        .map(|(id, instruction, success, created_at)| {
            json!({"id": id, "instruction": instruction, "success": success, "created_at": created_at})
        })
        .collect()
}

#[async_trait]
impl ToolAdapter for HistoryAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        match step.step_type.as_str() {
            "get_task_history" => {
                let limit = step.params.get("limit").and_then(Value::as_i64).unwrap_or(10);
                match self.store.recent_tasks(limit) {
                    Ok(rows) => {
                        let items = history_rows_to_json(rows);
                        let mut result = StepResult::success(format!("{} recent task(s)", items.len()));
                        result.data = Some(StepResultData {
                            extra: [("tasks".to_string(), json!(items))].into(),
                            ..Default::default()
                        });
                        result
                    }
                    Err(e) => StepResult::failure(format!("get_task_history failed: {}", e)),
                }
            }
            "search_history" => {
                let Some(query) = step.params.get("query").and_then(Value::as_str) else {
                    return StepResult::failure("search_history: missing 'query' parameter");
                };
                match self.store.search_tasks(query) {
                    Ok(rows) => {
                        let items = history_rows_to_json(rows);
                        let mut result = StepResult::success(format!("{} matching task(s)", items.len()));
                        result.data = Some(StepResultData {
                            extra: [("tasks".to_string(), json!(items))].into(),
                            ..Default::default()
                        });
                        result
                    }
                    Err(e) => StepResult::failure(format!("search_history failed: {}", e)),
                }
            }
            "add_favorite" => {
                let Some(instruction) = step.params.get("instruction").and_then(Value::as_str) else {
                    return StepResult::failure("add_favorite: missing 'instruction' parameter");
                };
                match self.store.add_favorite(instruction) {
                    Ok(id) => {
                        let mut result = StepResult::success("saved favorite");
                        result.data = Some(StepResultData {
                            extra: [("favorite_id".to_string(), Value::String(id))].into(),
                            ..Default::default()
                        });
                        result
                    }
                    Err(e) => StepResult::failure(format!("add_favorite failed: {}", e)),
                }
            }
            "list_favorites" => match self.store.list_favorites() {
                Ok(rows) => {
                    let items: Vec<Value> = rows
                        .into_iter()
                        .map(|(id, instruction)| json!({"id": id, "instruction": instruction}))
                        .collect();
                    let mut result = StepResult::success(format!("{} favorite(s)", items.len()));
                    result.data = Some(StepResultData {
                        extra: [("favorites".to_string(), json!(items))].into(),
                        ..Default::default()
                    });
                    result
                }
                Err(e) => StepResult::failure(format!("list_favorites failed: {}", e)),
            },
            "remove_favorite" => {
                let Some(id) = step.params.get("favorite_id").and_then(Value::as_str) else {
                    return StepResult::failure("remove_favorite: missing 'favorite_id' parameter");
                };
                match self.store.remove_favorite(id) {
                    Ok(true) => StepResult::success(format!("removed favorite {}", id)),
                    Ok(false) => StepResult::failure(format!("no favorite with id {}", id)),
                    Err(e) => StepResult::failure(format!("remove_favorite failed: {}", e)),
                }
            }
            other => StepResult::failure(format!("history adapter: unsupported type {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn adapter() -> HistoryAdapter {
        let path = std::env::temp_dir().join(format!("taskagent-history-{}.db", Uuid::new_v4()));
        HistoryAdapter::new(Arc::new(SqliteStore::open(&path).unwrap()))
    }

    #[tokio::test]
    async fn favorite_round_trip() {
        let adapter = adapter();
        let mut ctx = Context::new("2026-07-27T00:00:00Z");

        let add = Step::new("add_favorite", "save").with_param("instruction", Value::String("clean desktop".into()));
        let add_result = adapter.execute(&add, &mut ctx).await;
        assert!(add_result.success);
        let id = add_result.data.unwrap().extra.get("favorite_id").unwrap().as_str().unwrap().to_string();

        let list_result = adapter.execute(&Step::new("list_favorites", "list"), &mut ctx).await;
        assert_eq!(list_result.data.unwrap().extra.get("favorites").unwrap().as_array().unwrap().len(), 1);

        let remove = Step::new("remove_favorite", "remove").with_param("favorite_id", Value::String(id));
        assert!(adapter.execute(&remove, &mut ctx).await.success);
    }

    #[tokio::test]
    async fn search_history_missing_query_fails() {
        let adapter = adapter();
        let mut ctx = Context::new("2026-07-27T00:00:00Z");
        let result = adapter.execute(&Step::new("search_history", "search"), &mut ctx).await;
        assert!(!result.success);
    }
}
