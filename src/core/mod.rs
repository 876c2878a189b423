//! Core module - fundamental traits and types shared across the engine
//!
//! - `provider`: the uniform `LlmProvider` trait every vendor adapter implements
//! - `types`: message/role types shared by the planner, reflector, and providers

pub mod provider;
pub mod types;

pub use provider::{GenerationOptions, LlmProvider, LlmResponse, ModelInfo, ProviderMeta, StreamingChunk};
pub use types::*;
