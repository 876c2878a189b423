//! Storage configuration types
//!
//! Structured memory (rusqlite, single file) and vector memory (local ANN
//! index plus JSONL record logs) are both local-first: no network database.

use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite configuration for structured memory
    #[serde(default)]
    pub sqlite: SqliteConfig,
    /// Memory (vector store) configuration
    #[serde(default)]
    pub memory: MemoryStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            sqlite: SqliteConfig::default(),
            memory: MemoryStorageConfig::default(),
        }
    }
}

/// SQLite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file path
    #[serde(default = "default_sqlite_path")]
    pub path: String,
    /// Enable WAL mode
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Busy timeout in milliseconds
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        SqliteConfig {
            path: default_sqlite_path(),
            wal_mode: true,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

fn default_sqlite_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("taskagent").join("memory.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("memory.db"))
        .to_string_lossy()
        .to_string()
}

fn default_busy_timeout() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

/// Vector memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStorageConfig {
    /// Directory holding the JSONL record logs and ANN index files
    #[serde(default = "default_vector_dir")]
    pub path: String,
    /// Citations mode
    #[serde(default)]
    pub citations: CitationsMode,
    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        MemoryStorageConfig {
            path: default_vector_dir(),
            citations: CitationsMode::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

fn default_vector_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("taskagent").join("vector_memory"))
        .unwrap_or_else(|| std::path::PathBuf::from("vector_memory"))
        .to_string_lossy()
        .to_string()
}

/// Citations mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationsMode {
    #[default]
    Auto,
    On,
    Off,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dimensions: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dims(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}

fn default_embedding_model() -> String {
    "multilingual-e5-small".to_string()
}

fn default_embedding_dims() -> u32 {
    384
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert!(config.sqlite.wal_mode);
    }

    #[test]
    fn test_sqlite_config_default() {
        let config = SqliteConfig::default();
        assert!(config.path.ends_with("memory.db"));
    }
}
