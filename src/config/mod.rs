//! Configuration module - modular configuration management
//!
//! - types/mod.rs: Config, AgentConfig, EmailConfig
//! - types/provider.rs: LLM provider configuration
//! - types/storage.rs: structured/vector memory configuration
//! - types/sandbox.rs: sandbox/execution configuration
//! - io.rs: configuration loading and saving
//! - validation.rs: configuration validation
//! - paths.rs: configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{AgentConfig, Config, EmailConfig, ThinkingLevel};

pub use types::provider::{
    ClaudeConfig, CustomProviderConfig, DeepSeekConfig, FailoverConfig, GrokConfig, OpenAIConfig,
    ProviderConfig,
};

pub use types::storage::{CitationsMode, EmbeddingConfig, MemoryStorageConfig, SqliteConfig, StorageConfig};

pub use types::sandbox::{ExecutionEnv, OsSandboxConfig, SandboxConfig, WasmConfig};

pub use io::{apply_env_overrides, load_config, save_config, ConfigSnapshot};
pub use paths::{
    cache_dir, config_dir, config_path, credentials_dir, ensure_all_dirs, ensure_dir, logs_dir,
    state_dir, user_input_response_path, workspace_dir,
};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
