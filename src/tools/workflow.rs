//! Workflow adapters — `create_workflow`, `list_workflows`, `delete_workflow`.
//! A workflow is a named, saved plan (a JSON array of steps) a user can
//! replay by name later; storage mirrors the reminder/history adapters.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::model::{Context, Step, StepResult};
use crate::tools::store::SqliteStore;
use crate::tools::traits::ToolAdapter;

#[derive(Clone)]
pub struct WorkflowAdapter {
    store: Arc<SqliteStore>,
}

impl WorkflowAdapter {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        WorkflowAdapter { store }
    }
}

#[async_trait]
impl ToolAdapter for WorkflowAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        match step.step_type.as_str() {
            "create_workflow" => {
                let Some(name) = step.params.get("name").and_then(Value::as_str) else {
                    return StepResult::failure("create_workflow: missing 'name' parameter");
                };
                let steps_json = step
                    .params
                    .get("steps")
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new()))
                    .to_string();
                match self.store.add_workflow(name, &steps_json) {
                    Ok(id) => {
                        let mut result = StepResult::success(format!("saved workflow '{}'", name));
                        result.data = Some(crate::model::StepResultData {
                            extra: [("workflow_id".to_string(), Value::String(id))].into(),
                            ..Default::default()
                        });
                        result
                    }
                    Err(e) => StepResult::failure(format!("create_workflow failed: {}", e)),
                }
            }
            "list_workflows" => match self.store.list_workflows() {
                Ok(rows) => {
                    let items: Vec<Value> = rows
                        .into_iter()
                        .map(|(id, name)| json!({"id": id, "name": name}))
                        .collect();
                    let mut result = StepResult::success(format!("{} saved workflow(s)", items.len()));
                    result.data = Some(crate::model::StepResultData {
                        extra: [("workflows".to_string(), json!(items))].into(),
                        ..Default::default()
                    });
                    result
                }
                Err(e) => StepResult::failure(format!("list_workflows failed: {}", e)),
            },
            "delete_workflow" => {
                let Some(id) = step.params.get("workflow_id").and_then(Value::as_str) else {
                    return StepResult::failure("delete_workflow: missing 'workflow_id' parameter");
                };
                match self.store.delete_workflow(id) {
                    Ok(true) => StepResult::success(format!("deleted workflow {}", id)),
                    Ok(false) => StepResult::failure(format!("no workflow with id {}", id)),
                    Err(e) => StepResult::failure(format!("delete_workflow failed: {}", e)),
                }
            }
            other => StepResult::failure(format!("workflow adapter: unsupported type {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn adapter() -> WorkflowAdapter {
        let path = std::env::temp_dir().join(format!("taskagent-workflow-{}.db", Uuid::new_v4()));
        WorkflowAdapter::new(Arc::new(SqliteStore::open(&path).unwrap()))
    }

    #[tokio::test]
    async fn create_list_delete_round_trip() {
        let adapter = adapter();
        let mut ctx = Context::new("2026-07-27T00:00:00Z");

        let create_step = Step::new("create_workflow", "save workflow")
            .with_param("name", Value::String("morning cleanup".into()))
            .with_param("steps", json!([{"type": "list_files", "action": "list desktop"}]));
        let create_result = adapter.execute(&create_step, &mut ctx).await;
        assert!(create_result.success);
        let id = create_result
            .data
            .unwrap()
            .extra
            .get("workflow_id")
            .unwrap()
            .as_str()
            .unwrap()
            .to_string();

        let list_result = adapter.execute(&Step::new("list_workflows", "list"), &mut ctx).await;
        assert_eq!(
            list_result.data.unwrap().extra.get("workflows").unwrap().as_array().unwrap().len(),
            1
        );

        let delete_step = Step::new("delete_workflow", "delete").with_param("workflow_id", Value::String(id));
        assert!(adapter.execute(&delete_step, &mut ctx).await.success);
    }
}
