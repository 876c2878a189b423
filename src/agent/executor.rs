//! Plan Executor — runs a plan step by step with bounded per-step retry and
//! reflection-guided repair.
//!
//! Ported from `original_source/agent/orchestrator/plan_executor.py`'s
//! `PlanExecutor`: `execute_plan` emits lifecycle events and stops on the
//! first failed step; `execute_step_with_retry` loops up to `max_attempts`,
//! short-circuiting immediately on a config/user-action error, otherwise
//! asking the reflector for a modified step or sleeping 1s before the final
//! retry. Executor selection here is the registry's alias-normalized
//! lookup (`tools::registry::ToolRegistry::resolve`) rather than the
//! Python original's per-category dispatch table, since every canonical
//! step type maps to exactly one registered adapter in this workspace.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::agent::reflector::Reflector;
use crate::model::{Context, Plan, Step, StepOutcome, StepResult, TaskResult};
use crate::tools::ToolRegistry;

/// Callback used to stream lifecycle events to the service loop. Mirrors
/// the Python original's `emit_callback(event_type, data)`.
pub type Emit = dyn Fn(&str, Value) + Send + Sync;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub struct PlanExecutor {
    registry: Arc<ToolRegistry>,
    reflector: Arc<Reflector>,
    emit: Arc<Emit>,
}

impl PlanExecutor {
    pub fn new(registry: Arc<ToolRegistry>, reflector: Arc<Reflector>, emit: Arc<Emit>) -> Self {
        PlanExecutor { registry, reflector, emit }
    }

    fn emit(&self, event_type: &str, data: Value) {
        (self.emit)(event_type, data);
    }

    /// Execute every step of `plan` in order, stopping at the first failure
    /// or when `context.stop_flag` is set.
    pub async fn execute_plan(&self, plan: &Plan, user_instruction: &str, context: &mut Context) -> TaskResult {
        let started = Instant::now();
        let mut outcomes: Vec<StepOutcome> = Vec::with_capacity(plan.len());
        let mut overall_success = true;
        let mut failure_reason = String::new();

        self.emit("execution_started", json!({"step_count": plan.len(), "attempt": 1}));

        for (index, step) in plan.iter().enumerate() {
            if context.stop_flag {
                info!("execute_plan: stop flag set, halting before step {}", index);
                break;
            }

            self.emit(
                "step_started",
                json!({"step_index": index, "total_steps": plan.len(), "step": step, "action": step.action}),
            );

            let result = self.execute_step_with_retry(step, index, DEFAULT_MAX_ATTEMPTS, context).await;

            if result.success {
                self.emit(
                    "step_completed",
                    json!({"step_index": index, "total_steps": plan.len(), "step": step, "result": result, "status": "success"}),
                );
            } else {
                overall_success = false;
                failure_reason = result.message.clone();
                self.emit(
                    "step_failed",
                    json!({"step_index": index, "total_steps": plan.len(), "step": step, "result": result, "error": failure_reason, "status": "failed"}),
                );
                outcomes.push(StepOutcome { index, step: step.clone(), result });
                break;
            }

            outcomes.push(StepOutcome { index, step: step.clone(), result });
        }

        TaskResult {
            success: overall_success,
            message: if overall_success {
                "execution completed".to_string()
            } else {
                format!("execution failed: {}", failure_reason)
            },
            duration: started.elapsed().as_secs_f64(),
            mode: None,
            steps: Some(outcomes),
            user_instruction: user_instruction.to_string(),
            fallback: None,
        }
    }

    async fn execute_step_with_retry(&self, step: &Step, step_index: usize, max_attempts: u32, context: &mut Context) -> StepResult {
        let mut current_step = step.clone();
        let mut last_result = StepResult::failure("no attempt made");

        for attempt in 1..=max_attempts {
            let Some((canonical_type, adapter)) = self.registry.resolve(&current_step) else {
                return StepResult::failure(format!("no executor registered for step type '{}'", current_step.step_type));
            };

            if canonical_type != current_step.step_type {
                current_step.step_type = canonical_type;
            }

            let result = adapter.execute(&current_step, context).await;
            last_result = result.clone();

            if result.success {
                return result;
            }

            if result.is_config_error() || result.requires_user_action_flag() {
                warn!(step_index, attempt, message = %result.message, "step failed with non-retryable error");
                return result;
            }

            warn!(step_index, attempt, max_attempts, message = %result.message, "step failed, considering retry");

            if attempt < max_attempts {
                self.emit("thinking", json!({"content": "step failed, analyzing a fix...", "phase": "reflection"}));
                let verdict = self
                    .reflector
                    .analyze_failure(&current_step, &result.message, &context.summary())
                    .await;

                if verdict.is_retryable {
                    if let Some(modified) = verdict.modified_step {
                        info!(step_index, reason = %verdict.reason, "reflector suggested a fix");
                        current_step = modified;
                        self.emit("thinking", json!({"content": format!("applying fix: {}", verdict.reason), "phase": "reflection_applied"}));
                        continue;
                    }
                }
                info!(step_index, reason = %verdict.reason, "reflector judged this non-retryable");
                tokio::time::sleep(Duration::from_secs(1)).await;
            } else {
                return result;
            }
        }

        last_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::model::StepResultData;
    use crate::tools::traits::ToolAdapter;

    struct AlwaysFails;
    #[async_trait]
    impl ToolAdapter for AlwaysFails {
        async fn execute(&self, _step: &Step, _context: &mut Context) -> StepResult {
            StepResult::failure("simulated failure")
        }
    }

    struct RequiresUserAction;
    #[async_trait]
    impl ToolAdapter for RequiresUserAction {
        async fn execute(&self, _step: &Step, _context: &mut Context) -> StepResult {
            let mut result = StepResult::failure("needs an api key");
            result.data = Some(StepResultData { is_config_error: true, ..Default::default() });
            result
        }
    }

    struct Succeeds;
    #[async_trait]
    impl ToolAdapter for Succeeds {
        async fn execute(&self, _step: &Step, _context: &mut Context) -> StepResult {
            StepResult::success("done")
        }
    }

    fn executor_with(registry: ToolRegistry) -> PlanExecutor {
        let reflector = Arc::new(Reflector::new(None, "test-model"));
        let emit: Arc<Emit> = Arc::new(|_, _| {});
        PlanExecutor::new(Arc::new(registry), reflector, emit)
    }

    #[tokio::test]
    async fn successful_step_returns_immediately() {
        let mut registry = ToolRegistry::new();
        registry.register("open_app", Box::new(Succeeds));
        let executor = executor_with(registry);
        let plan: Plan = vec![Step::new("open_app", "open safari")];
        let mut ctx = Context::new("2026-07-27T00:00:00Z");
        let result = executor.execute_plan(&plan, "open safari", &mut ctx).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn config_error_short_circuits_without_retry() {
        let mut registry = ToolRegistry::new();
        registry.register("send_email", Box::new(RequiresUserAction));
        let executor = executor_with(registry);
        let plan: Plan = vec![Step::new("send_email", "send an email")];
        let mut ctx = Context::new("2026-07-27T00:00:00Z");
        let result = executor.execute_plan(&plan, "send an email", &mut ctx).await;
        assert!(!result.success);
        assert_eq!(result.steps.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unregistered_step_type_fails_without_panic() {
        let registry = ToolRegistry::new();
        let executor = executor_with(registry);
        let plan: Plan = vec![Step::new("nonexistent_type", "do something")];
        let mut ctx = Context::new("2026-07-27T00:00:00Z");
        let result = executor.execute_plan(&plan, "do something", &mut ctx).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn stop_flag_halts_before_remaining_steps() {
        let mut registry = ToolRegistry::new();
        registry.register("open_app", Box::new(Succeeds));
        let executor = executor_with(registry);
        let plan: Plan = vec![Step::new("open_app", "first"), Step::new("open_app", "second")];
        let mut ctx = Context::new("2026-07-27T00:00:00Z");
        ctx.stop_flag = true;
        let result = executor.execute_plan(&plan, "two steps", &mut ctx).await;
        assert!(result.steps.unwrap().is_empty());
    }
}
