//! SQLite-backed store shared by the reminder, workflow, and history
//! adapters. Uses the same database file as structured memory (`rusqlite`,
//! bundled, single file, local-first).

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    pub fn add_reminder(&self, text: &str, due_at: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO reminders (id, text, due_at, created_at, cancelled) VALUES (?1, ?2, ?3, ?4, 0)",
            params![id, text, due_at, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn list_reminders(&self) -> Result<Vec<(String, String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, text, due_at FROM reminders WHERE cancelled = 0 ORDER BY due_at")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn cancel_reminder(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute("UPDATE reminders SET cancelled = 1 WHERE id = ?1", params![id])?;
        Ok(updated > 0)
    }

    pub fn add_workflow(&self, name: &str, steps_json: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO workflows (id, name, steps_json, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, steps_json, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn list_workflows(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name FROM workflows ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn delete_workflow(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM workflows WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    pub fn record_task(&self, instruction: &str, success: bool, summary: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO task_history (id, instruction, success, summary, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, instruction, success, summary, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn recent_tasks(&self, limit: i64) -> Result<Vec<(String, String, bool, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, instruction, success, created_at FROM task_history ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn search_tasks(&self, query: &str) -> Result<Vec<(String, String, bool, String)>> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            "SELECT id, instruction, success, created_at FROM task_history \
             WHERE instruction LIKE ?1 ORDER BY created_at DESC LIMIT 50",
        )?;
        let rows = stmt.query_map(params![pattern], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn add_favorite(&self, instruction: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO favorites (id, instruction, created_at) VALUES (?1, ?2, ?3)",
            params![id, instruction, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    pub fn list_favorites(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, instruction FROM favorites ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn remove_favorite(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM favorites WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS reminders (
    id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    due_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    cancelled INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    steps_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS task_history (
    id TEXT PRIMARY KEY,
    instruction TEXT NOT NULL,
    success INTEGER NOT NULL,
    summary TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS favorites (
    id TEXT PRIMARY KEY,
    instruction TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let path = std::env::temp_dir().join(format!("taskagent-test-{}.db", Uuid::new_v4()));
        SqliteStore::open(&path).unwrap()
    }

    #[test]
    fn reminder_round_trip() {
        let store = store();
        let id = store.add_reminder("water the plants", "2026-07-28T09:00:00Z").unwrap();
        assert_eq!(store.list_reminders().unwrap().len(), 1);
        assert!(store.cancel_reminder(&id).unwrap());
        assert_eq!(store.list_reminders().unwrap().len(), 0);
    }

    #[test]
    fn favorite_round_trip() {
        let store = store();
        let id = store.add_favorite("open the weekly report").unwrap();
        assert_eq!(store.list_favorites().unwrap().len(), 1);
        assert!(store.remove_favorite(&id).unwrap());
        assert_eq!(store.list_favorites().unwrap().len(), 0);
    }

    #[test]
    fn task_history_search_matches_substring() {
        let store = store();
        store.record_task("rename files on desktop", true, "done").unwrap();
        store.record_task("send an email to alice", true, "done").unwrap();
        let hits = store.search_tasks("desktop").unwrap();
        assert_eq!(hits.len(), 1);
    }
}
