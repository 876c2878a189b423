//! Structured memory — preferences, file records, instruction history,
//! knowledge triples, and task records, all backed by `rusqlite`.
//!
//! Grounded in `original_source/agent/memory/` (the sqlite-backed tables
//! alongside the Chroma-backed vector memory) and generalized into the
//! single-connection-plus-mutex pattern used elsewhere in this crate
//! (`tools::store::SqliteStore`). Every write runs inside an explicit
//! transaction that rolls back on error; reads take a short-lived lock.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{CompactStep, TaskRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    value_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS file_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    operation TEXT NOT NULL,
    file_type TEXT,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS instructions (
    id TEXT PRIMARY KEY,
    instruction TEXT NOT NULL,
    success INTEGER NOT NULL,
    duration_s REAL NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS knowledge_triples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject TEXT NOT NULL,
    predicate TEXT NOT NULL,
    object TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 1.0
);

CREATE TABLE IF NOT EXISTS task_records (
    id TEXT PRIMARY KEY,
    instruction TEXT NOT NULL,
    steps_json TEXT NOT NULL,
    success INTEGER NOT NULL,
    duration_s REAL NOT NULL,
    files_involved_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_file_records_path ON file_records(path);
CREATE INDEX IF NOT EXISTS idx_instructions_text ON instructions(instruction);
";

/// Structured (sqlite-backed) half of the agent's memory.
pub struct StructuredMemory {
    conn: Mutex<Connection>,
}

impl StructuredMemory {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(StructuredMemory { conn: Mutex::new(conn) })
    }

    pub async fn set_preference(&self, key: &str, category: &str, value: &Value) -> Result<()> {
        let conn = self.conn.lock().await;
        let value_json = serde_json::to_string(value)?;
        let tx = conn.unchecked_transaction()?;
        let result = tx.execute(
            "INSERT INTO preferences (key, category, value_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET category = excluded.category, value_json = excluded.value_json",
            params![key, category, value_json],
        );
        match result {
            Ok(_) => {
                tx.commit()?;
                Ok(())
            }
            Err(e) => {
                tx.rollback()?;
                Err(Error::from(e))
            }
        }
    }

    pub async fn get_preference(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().await;
        let raw: Option<String> = conn
            .query_row("SELECT value_json FROM preferences WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn get_all_preferences(&self, category: Option<&str>) -> Result<Vec<(String, String, Value)>> {
        let conn = self.conn.lock().await;
        let mut out = Vec::new();
        let mut collect = |key: String, category: String, raw: String| {
            if let Ok(value) = serde_json::from_str(&raw) {
                out.push((key, category, value));
            }
        };
        if let Some(cat) = category {
            let mut stmt = conn.prepare("SELECT key, category, value_json FROM preferences WHERE category = ?1")?;
            let rows = stmt.query_map(params![cat], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?;
            for row in rows {
                let (key, category, raw) = row?;
                collect(key, category, raw);
            }
        } else {
            let mut stmt = conn.prepare("SELECT key, category, value_json FROM preferences")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?;
            for row in rows {
                let (key, category, raw) = row?;
                collect(key, category, raw);
            }
        }
        Ok(out)
    }

    pub async fn add_file_record(&self, path: &str, operation: &str, file_type: Option<&str>, recorded_at: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO file_records (path, operation, file_type, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![path, operation, file_type, recorded_at],
        )?;
        Ok(())
    }

    pub async fn get_recent_files(&self, limit: usize) -> Result<Vec<(String, String, String)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT path, operation, recorded_at FROM file_records ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn add_instruction(&self, id: &str, instruction: &str, success: bool, duration_s: f64, recorded_at: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO instructions (id, instruction, success, duration_s, recorded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, instruction, success as i64, duration_s, recorded_at],
        )?;
        Ok(())
    }

    /// Keyword/substring match against recorded instructions; distinct from
    /// the embedding-based similarity search in vector memory.
    pub async fn get_similar_instructions(&self, keyword: &str, limit: usize) -> Result<Vec<(String, bool, f64)>> {
        let conn = self.conn.lock().await;
        let pattern = format!("%{}%", keyword);
        let mut stmt = conn.prepare(
            "SELECT instruction, success, duration_s FROM instructions
             WHERE instruction LIKE ?1 ORDER BY recorded_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![pattern, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? != 0, row.get::<_, f64>(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn add_knowledge(&self, subject: &str, predicate: &str, object: &str, confidence: f64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO knowledge_triples (subject, predicate, object, confidence) VALUES (?1, ?2, ?3, ?4)",
            params![subject, predicate, object, confidence],
        )?;
        Ok(())
    }

    pub async fn query_knowledge(&self, subject: &str) -> Result<Vec<(String, String, f64)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT predicate, object, confidence FROM knowledge_triples WHERE subject = ?1 ORDER BY confidence DESC",
        )?;
        let rows = stmt.query_map(params![subject], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn record_task(&self, record: &TaskRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        let steps_json = serde_json::to_string(&record.steps)?;
        let files_json = serde_json::to_string(&record.files_involved)?;
        let tx = conn.unchecked_transaction()?;
        let result = tx.execute(
            "INSERT INTO task_records (id, instruction, steps_json, success, duration_s, files_involved_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.instruction,
                steps_json,
                record.success as i64,
                record.duration_s,
                files_json,
                record.created_at,
            ],
        );
        match result {
            Ok(_) => {
                tx.commit()?;
                Ok(())
            }
            Err(e) => {
                tx.rollback()?;
                Err(Error::from(e))
            }
        }
    }

    pub async fn recent_task_records(&self, limit: usize) -> Result<Vec<TaskRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, instruction, steps_json, success, duration_s, files_involved_json, created_at
             FROM task_records ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)? != 0,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, instruction, steps_json, success, duration_s, files_json, created_at) = row?;
            let steps: Vec<CompactStep> = serde_json::from_str(&steps_json).unwrap_or_default();
            let files_involved: Vec<String> = serde_json::from_str(&files_json).unwrap_or_default();
            out.push(TaskRecord {
                id,
                instruction,
                steps,
                success,
                duration_s,
                files_involved,
                created_at,
            });
        }
        Ok(out)
    }

    /// Assembles a short, human-readable context block from preferences and
    /// recent files for injection into the planner's prompt.
    pub async fn get_memory_context(&self) -> Result<String> {
        let mut parts = Vec::new();

        let prefs = self.get_all_preferences(None).await?;
        if !prefs.is_empty() {
            let lines: Vec<String> = prefs
                .iter()
                .take(10)
                .map(|(key, _, value)| format!("- {}: {}", key, value))
                .collect();
            parts.push(format!("**known preferences**:\n{}", lines.join("\n")));
        }

        let files = self.get_recent_files(5).await?;
        if !files.is_empty() {
            let lines: Vec<String> = files
                .iter()
                .map(|(path, op, _)| format!("- {} ({})", path, op))
                .collect();
            parts.push(format!("**recently touched files**:\n{}", lines.join("\n")));
        }

        Ok(parts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn memory() -> StructuredMemory {
        let path = std::env::temp_dir().join(format!("taskagent-structured-{}.db", Uuid::new_v4()));
        StructuredMemory::open(&path).unwrap()
    }

    #[tokio::test]
    async fn preference_round_trip() {
        let mem = memory();
        mem.set_preference("theme", "ui", &Value::String("dark".into())).await.unwrap();
        let got = mem.get_preference("theme").await.unwrap();
        assert_eq!(got, Some(Value::String("dark".into())));

        mem.set_preference("theme", "ui", &Value::String("light".into())).await.unwrap();
        let got = mem.get_preference("theme").await.unwrap();
        assert_eq!(got, Some(Value::String("light".into())));
    }

    #[tokio::test]
    async fn instruction_keyword_search() {
        let mem = memory();
        mem.add_instruction("1", "open safari and go to github", true, 2.5, "2026-07-27T00:00:00Z").await.unwrap();
        mem.add_instruction("2", "delete old screenshots", true, 1.0, "2026-07-27T00:01:00Z").await.unwrap();
        let hits = mem.get_similar_instructions("safari", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].0.contains("safari"));
    }

    #[tokio::test]
    async fn task_record_round_trip() {
        let mem = memory();
        let record = TaskRecord {
            id: "t1".into(),
            instruction: "open calculator".into(),
            steps: vec![CompactStep { step_type: "open_app".into(), action: "open calculator".into(), description: None }],
            success: true,
            duration_s: 0.8,
            files_involved: vec![],
            created_at: "2026-07-27T00:00:00Z".into(),
        };
        mem.record_task(&record).await.unwrap();
        let recent = mem.recent_task_records(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].instruction, "open calculator");
    }
}
