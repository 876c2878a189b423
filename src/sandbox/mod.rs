//! Sandbox module - script validation and code execution environments
//!
//! Two tiers, selected by `SandboxConfig::execution_env`:
//! - `Os`: unrestricted subprocess execution (used for real execution of
//!   adapter-generated scripts once validation has passed).
//! - `Sandbox`: path-restricted subprocess execution (used for the dry-run
//!   validation pass, always under `allowed_dir`).
//!
//! `validator` layers a static deny-list lint and an output-contract check
//! on top of either executor before a script is allowed to run for real.

mod executor;
mod os_sandbox;
mod validator;

pub use executor::{CodeExecutor, ExecutionRequest, ExecutionResult, Language};
pub use os_sandbox::OsSandbox;
pub use validator::{ScriptValidator, ValidationKind, ValidationReport};

use crate::config::{ExecutionEnv, SandboxConfig};
use crate::error::Result;

/// Create an executor based on the configuration.
pub async fn create_executor(config: &SandboxConfig) -> Result<Box<dyn CodeExecutor>> {
    match config.execution_env {
        ExecutionEnv::Os => {
            let executor = OsSandbox::new_unrestricted(config.allowed_dir.clone());
            Ok(Box::new(executor))
        }
        ExecutionEnv::Sandbox => {
            let executor = OsSandbox::new(config.allowed_dir.clone());
            Ok(Box::new(executor))
        }
    }
}
