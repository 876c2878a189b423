//! # taskagent
//!
//! Task orchestration and execution engine for an autonomous desktop
//! automation agent. A single natural-language instruction comes in over a
//! line-JSON stdio protocol; it is turned into a sequence of concrete tool
//! invocations, run with retries and self-healing, and recorded for future
//! recall.
//!
//! ## Architecture
//!
//! Dependency order, leaves first:
//!
//! - **Config Store** (`config`): typed settings, atomic reload
//! - **Core** (`core`): the `LlmProvider` trait and shared message types
//! - **Memory** (`memory`): embedding provider, structured memory (rusqlite),
//!   vector memory (local ANN index)
//! - **Intent Router** (`intent`): cosine-similarity fast path
//! - **Tools** (`tools`): the adapter registry and dispatch contract
//! - **Sandbox** (`sandbox`): script validation and dry-run execution
//! - **Agent** (`agent`): planner, reflector, plan executor, orchestrator
//! - **Service Loop** (`service`): the stdio protocol binding everything
//!   together
//!
//! ## Design Principles
//!
//! 1. Trait-based abstraction at integration seams (providers, tools)
//! 2. Modular configuration, following the teacher's focused-module pattern
//! 3. No tool semantics beyond the dispatch contract — the engine is
//!    tool-agnostic; new tool kinds are added by registering adapters

pub mod agent;
pub mod core;
#[path = "config/mod.rs"]
pub mod config;
pub mod error;
pub mod intent;
pub mod memory;
pub mod model;
pub mod sandbox;
pub mod service;
pub mod tools;

pub use error::{Error, Result};

pub use core::{LlmProvider, LlmResponse, Message, Role};
pub use model::{
    CompactStep, Context, Instruction, IntentMatch, Plan, ReflectionVerdict, Step, StepOutcome,
    StepResult, StepResultData, TaskRecord, TaskResult,
};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
