//! Sandbox configuration types
//!
//! Configuration for script validation and execution (OS subprocess, Wasm).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Execution environment used for the dry-run and the real execution
    #[serde(default)]
    pub execution_env: ExecutionEnv,
    /// Allowed directory for file operations and script scratch space
    #[serde(default = "default_allowed_dir")]
    pub allowed_dir: PathBuf,
    /// Wasm configuration (used when `execution_env = sandbox`)
    #[serde(default)]
    pub wasm: WasmConfig,
    /// OS sandbox configuration (used when `execution_env = os`)
    #[serde(default)]
    pub os: OsSandboxConfig,
    /// Default timeout for real execution
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,
    /// Timeout for the dry-run validation pass (spec default: 2s)
    #[serde(default = "default_dry_run_timeout")]
    pub dry_run_timeout_secs: u64,
    /// Maximum output size in bytes
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            execution_env: ExecutionEnv::default(),
            allowed_dir: default_allowed_dir(),
            wasm: WasmConfig::default(),
            os: OsSandboxConfig::default(),
            default_timeout_secs: default_timeout(),
            dry_run_timeout_secs: default_dry_run_timeout(),
            max_output_bytes: default_max_output(),
        }
    }
}

fn default_allowed_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".taskagent").join("sandbox").join("scripts"))
        .unwrap_or_else(|| PathBuf::from("./sandbox/scripts"))
}

fn default_timeout() -> u64 {
    30
}

fn default_dry_run_timeout() -> u64 {
    2
}

fn default_max_output() -> usize {
    1024 * 1024 // 1MB
}

/// Execution environment type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionEnv {
    /// OS sandbox (allowed-dir-restricted subprocess)
    #[default]
    Os,
    /// WebAssembly sandbox (stricter isolation, no filesystem/network by default)
    Sandbox,
}

impl std::str::FromStr for ExecutionEnv {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "os" => Ok(ExecutionEnv::Os),
            "sandbox" | "wasm" => Ok(ExecutionEnv::Sandbox),
            _ => Err(crate::error::Error::Config(format!(
                "Invalid execution environment: {}. Valid: os, sandbox",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ExecutionEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionEnv::Os => write!(f, "os"),
            ExecutionEnv::Sandbox => write!(f, "sandbox"),
        }
    }
}

/// WebAssembly sandbox configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WasmConfig {
    /// Maximum memory in pages (64KB each)
    #[serde(default = "default_wasm_memory")]
    pub max_memory_pages: u32,
    /// Enable WASI
    #[serde(default = "default_true")]
    pub enable_wasi: bool,
    /// Allowed WASI directories
    #[serde(default)]
    pub wasi_dirs: Vec<PathBuf>,
    /// Fuel limit (for execution limiting)
    #[serde(default = "default_fuel")]
    pub fuel_limit: u64,
}

fn default_wasm_memory() -> u32 {
    256 // 16MB
}

fn default_true() -> bool {
    true
}

fn default_fuel() -> u64 {
    1_000_000_000
}

/// OS sandbox configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsSandboxConfig {
    /// Allowed executables (interpreter names resolved via `which`)
    #[serde(default)]
    pub allowed_executables: Vec<String>,
    /// Denied executables
    #[serde(default)]
    pub denied_executables: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_env_parsing() {
        assert_eq!("os".parse::<ExecutionEnv>().unwrap(), ExecutionEnv::Os);
        assert_eq!(
            "sandbox".parse::<ExecutionEnv>().unwrap(),
            ExecutionEnv::Sandbox
        );
        assert!("docker".parse::<ExecutionEnv>().is_err());
    }

    #[test]
    fn test_sandbox_config_default() {
        let config = SandboxConfig::default();
        assert_eq!(config.execution_env, ExecutionEnv::Os);
        assert_eq!(config.dry_run_timeout_secs, 2);
    }
}
