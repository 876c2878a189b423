//! Task Orchestrator — the brain: instruction in, `TaskResult` out.
//!
//! Ported from `original_source/agent/orchestrator/task_orchestrator.py`'s
//! `TaskOrchestrator.run`: reload config and rebuild the planner so a
//! changed API key/provider takes effect immediately, inject the current
//! time and the persistent file-context buffer ("Protocol R3" in the
//! original), try the intent router's fast path, else fetch vector-memory
//! context and run the full planner/executor pipeline, then record the
//! outcome to both memory layers without letting a memory-write failure
//! fail the task.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::agent::executor::{Emit, PlanExecutor};
use crate::agent::planner::Planner;
use crate::agent::providers::build_provider;
use crate::config::Config;
use crate::intent::{IntentRouter, DEFAULT_THRESHOLD};
use crate::memory::{StructuredMemory, VectorMemory};
use crate::model::{CompactStep, Context, Instruction, Step, TaskRecord, TaskResult};

const FILE_PARAM_KEYS: &[&str] = &["path", "file_path", "save_path"];

pub struct TaskOrchestrator {
    executor: Arc<PlanExecutor>,
    intent_router: Arc<IntentRouter>,
    structured_memory: Arc<StructuredMemory>,
    vector_memory: Arc<VectorMemory>,
    emit: Arc<Emit>,
}

impl TaskOrchestrator {
    pub fn new(
        executor: Arc<PlanExecutor>,
        intent_router: Arc<IntentRouter>,
        structured_memory: Arc<StructuredMemory>,
        vector_memory: Arc<VectorMemory>,
        emit: Arc<Emit>,
    ) -> Self {
        TaskOrchestrator {
            executor,
            intent_router,
            structured_memory,
            vector_memory,
            emit,
        }
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        (self.emit)(event_type, data);
    }

    pub async fn run(&self, instruction: &Instruction, base_context: Option<Context>) -> TaskResult {
        let started = std::time::Instant::now();

        let config = match crate::config::load_config() {
            Ok(c) => c,
            Err(e) => {
                let result = TaskResult {
                    success: false,
                    message: format!("config reload failed: {}", e),
                    duration: started.elapsed().as_secs_f64(),
                    mode: None,
                    steps: None,
                    user_instruction: instruction.text.clone(),
                    fallback: None,
                };
                self.record_outcome(instruction, &result).await;
                return result;
            }
        };

        let mut context = base_context.unwrap_or_else(|| Context::new(now_rfc3339()));
        context.current_time = now_rfc3339();

        self.emit(
            "thinking",
            json!({"content": format!("Received instruction: {}", truncate(&instruction.text, 50)), "phase": "analyzing"}),
        );

        if let Some(fast_result) = self.try_fast_path(instruction, &mut context).await {
            return fast_result;
        }

        let memory_context = self.vector_memory.get_memory_context(&instruction.text, 3).await;
        if !memory_context.is_empty() {
            context.memory_context = memory_context;
        }

        self.emit("thinking", json!({"content": "Planning steps...", "phase": "planning"}));

        let planner = match self.build_planner(&config).await {
            Ok(p) => p,
            Err(e) => {
                let result = TaskResult {
                    success: false,
                    message: format!("planner initialization failed: {}", e),
                    duration: started.elapsed().as_secs_f64(),
                    mode: None,
                    steps: None,
                    user_instruction: instruction.text.clone(),
                    fallback: None,
                };
                self.record_outcome(instruction, &result).await;
                return result;
            }
        };

        let plan = match planner.plan(instruction, &context).await {
            Ok(plan) => plan,
            Err(e) => {
                // `e` is already an `Error::Planner`, whose `Display` impl
                // reads "Planning failed: {0}" — don't wrap it again.
                let result = TaskResult {
                    success: false,
                    message: e.to_string(),
                    duration: started.elapsed().as_secs_f64(),
                    mode: None,
                    steps: None,
                    user_instruction: instruction.text.clone(),
                    fallback: None,
                };
                self.record_outcome(instruction, &result).await;
                return result;
            }
        };

        self.emit("plan_ready", json!({"content": "Plan generated.", "steps": plan, "step_count": plan.len()}));

        let mut result = self.executor.execute_plan(&plan, &instruction.text, &mut context).await;
        result.duration = started.elapsed().as_secs_f64();

        self.record_outcome(instruction, &result).await;

        result
    }

    async fn build_planner(&self, config: &Config) -> crate::error::Result<Planner> {
        let provider = build_provider(config)?;
        let model = config
            .agent
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        Ok(Planner::new(provider, model))
    }

    async fn try_fast_path(&self, instruction: &Instruction, context: &mut Context) -> Option<TaskResult> {
        let match_ = self.intent_router.detect(&instruction.text, DEFAULT_THRESHOLD).await?;

        let mut step = Step::new(match_.metadata.step_type.clone(), match_.metadata.action.clone())
            .with_param("instruction", serde_json::Value::String(instruction.text.clone()))
            .with_param("action", serde_json::Value::String(match_.metadata.action.clone()));
        step.description = Some(format!("Fast Execute: {}", match_.intent_type));

        if match_.metadata.step_type == "text_process" {
            step = step
                .with_param("text", serde_json::Value::String(instruction.text.clone()))
                .with_param("target_lang", serde_json::Value::String("English".to_string()));
        }

        if match_.intent_type == "app_open" || match_.intent_type == "app_close" {
            match crate::intent::app_name::extract(&instruction.text) {
                Some(app_name) => {
                    step = step.with_param("app_name", serde_json::Value::String(app_name));
                }
                None => {
                    warn!(instruction = %instruction.text, "fast path: could not extract app name, falling back to planner");
                    return None;
                }
            }
        }

        self.emit("thinking", json!({"content": format!("Fast path: {}", match_.intent_type), "phase": "fast_path"}));

        let plan = vec![step];
        let mut result = self.executor.execute_plan(&plan, &instruction.text, context).await;
        result.mode = Some("fast_path".to_string());

        self.record_outcome(instruction, &result).await;

        Some(result)
    }

    /// Records a task's outcome to both memory layers regardless of whether
    /// it succeeded, so future planning/reflection can learn from failures
    /// too, not just successes. `result.steps` is `None` for tasks that
    /// failed before a plan ever ran (config reload, planner init/plan
    /// failure); those are still completed tasks per spec.md §3/§4.11 and
    /// get a record with empty `steps`/`files_involved`, not no record.
    async fn record_outcome(&self, instruction: &Instruction, result: &TaskResult) {
        let empty = Vec::new();
        let outcomes = result.steps.as_ref().unwrap_or(&empty);

        let compact_steps: Vec<CompactStep> = outcomes.iter().map(|o| CompactStep::from(&o.step)).collect();
        let mut files_involved = Vec::new();
        for outcome in outcomes {
            for key in FILE_PARAM_KEYS {
                if let Some(value) = outcome.step.params.get(*key).and_then(|v| v.as_str()) {
                    files_involved.push(value.to_string());
                }
            }
        }

        let record = TaskRecord {
            id: uuid::Uuid::new_v4().to_string(),
            instruction: instruction.text.clone(),
            steps: compact_steps.clone(),
            success: result.success,
            duration_s: result.duration,
            files_involved: files_involved.clone(),
            created_at: now_rfc3339(),
        };

        if let Err(e) = self.structured_memory.record_task(&record).await {
            warn!(error = %e, "failed to record task in structured memory");
        }

        if let Err(e) = self
            .vector_memory
            .add_instruction_pattern(
                &instruction.text,
                &compact_steps,
                result.success,
                result.duration,
                files_involved,
                &record.created_at,
            )
            .await
        {
            warn!(error = %e, "failed to record instruction pattern in vector memory");
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect::<String>() + "..."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::executor::PlanExecutor;
    use crate::agent::reflector::Reflector;
    use crate::intent::IntentRouter;
    use crate::memory::{EmbeddingProvider, MemoryCache};
    use crate::tools::ToolRegistry;
    use uuid::Uuid;

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(truncate("hello", 50), "hello");
    }

    fn test_orchestrator() -> (TaskOrchestrator, Arc<StructuredMemory>) {
        let sqlite_path = std::env::temp_dir().join(format!("taskagent-orch-{}.db", Uuid::new_v4()));
        let vector_dir = std::env::temp_dir().join(format!("taskagent-orch-vec-{}", Uuid::new_v4()));
        let structured_memory = Arc::new(StructuredMemory::open(&sqlite_path).unwrap());
        let embedding = Arc::new(EmbeddingProvider::new());
        let vector_memory = Arc::new(VectorMemory::open(&vector_dir, Arc::clone(&embedding), MemoryCache::new()));
        let intent_router = Arc::new(IntentRouter::new(Arc::clone(&embedding)));
        let reflector = Arc::new(Reflector::new(None, "test-model"));
        let emit: Arc<Emit> = Arc::new(|_, _| {});
        let executor = Arc::new(PlanExecutor::new(Arc::new(ToolRegistry::new()), reflector, Arc::clone(&emit)));
        let orchestrator = TaskOrchestrator::new(
            executor,
            intent_router,
            Arc::clone(&structured_memory),
            vector_memory,
            emit,
        );
        (orchestrator, structured_memory)
    }

    #[tokio::test]
    async fn record_outcome_persists_a_record_even_without_steps() {
        let (orchestrator, structured_memory) = test_orchestrator();
        let instruction = Instruction::new("do something that never got to plan");
        let result = TaskResult {
            success: false,
            message: "planner initialization failed: missing api key".to_string(),
            duration: 0.01,
            mode: None,
            steps: None,
            user_instruction: instruction.text.clone(),
            fallback: None,
        };

        orchestrator.record_outcome(&instruction, &result).await;

        let recent = structured_memory.recent_task_records(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].success, false);
        assert!(recent[0].steps.is_empty());
        assert!(recent[0].files_involved.is_empty());
    }

    #[test]
    fn truncate_long_string_adds_ellipsis() {
        let long = "a".repeat(60);
        let truncated = truncate(&long, 50);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 53);
    }
}
