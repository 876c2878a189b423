//! Agent — planning, reflection-guided execution, and LLM provider adapters.
//!
//! This module handles everything downstream of an instruction and upstream
//! of a tool call:
//! - `providers`: the per-vendor `LlmProvider` implementations
//! - `planner`: instruction + context -> `Plan`
//! - `extractor`: fault-tolerant JSON extraction from LLM text
//! - `reflector`: failure analysis and step repair
//! - `executor`: runs a plan with bounded per-step retry
//! - `orchestrator`: the top-level entry point tying intent routing, memory,
//!   planning, and execution together
//! - `aliases`: step-type alias normalization for a confused planner/reflector

pub mod aliases;
pub mod executor;
pub mod extractor;
pub mod orchestrator;
pub mod planner;
pub mod providers;
pub mod reflector;

pub use executor::PlanExecutor;
pub use orchestrator::TaskOrchestrator;
pub use planner::Planner;
pub use reflector::Reflector;
