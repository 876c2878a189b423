//! File adapter — covers every `file_*`/`list_files` step type.
//!
//! One adapter handles the whole family (grounded in the same pattern as
//! `original_source`'s file-operation tools, which share a single
//! `FileManager`-style implementation dispatched by action): the canonical
//! `type` the executor resolved onto the step picks the branch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::fs;
use tracing::debug;

use crate::model::{Context, Step, StepResult};
use crate::tools::traits::ToolAdapter;

#[derive(Clone)]
pub struct FileAdapter {
    allowed_dir: PathBuf,
}

impl FileAdapter {
    pub fn new(allowed_dir: PathBuf) -> Self {
        FileAdapter { allowed_dir }
    }

    fn resolve_path(&self, raw: &str) -> PathBuf {
        let expanded = expand_tilde(raw);
        if expanded.is_absolute() {
            expanded
        } else {
            self.allowed_dir.join(expanded)
        }
    }

    fn param_path(&self, step: &Step, keys: &[&str]) -> Option<PathBuf> {
        for key in keys {
            if let Some(Value::String(s)) = step.params.get(*key) {
                return Some(self.resolve_path(s));
            }
        }
        None
    }
}

fn expand_tilde(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[async_trait]
impl ToolAdapter for FileAdapter {
    async fn execute(&self, step: &Step, _context: &mut Context) -> StepResult {
        match step.step_type.as_str() {
            "file_read" => self.file_read(step).await,
            "file_write" | "file_create" => self.file_write(step).await,
            "file_delete" => self.file_delete(step).await,
            "file_rename" => self.file_rename(step).await,
            "file_move" => self.file_move(step).await,
            "file_copy" => self.file_copy(step).await,
            "list_files" => self.list_files(step).await,
            "file_organize" | "file_batch_organize" => self.organize(step).await,
            "file_classify" => self.classify(step).await,
            "file_batch_rename" => self.batch_rename(step).await,
            "file_batch_copy" => self.batch_copy(step).await,
            other => StepResult::failure(format!("file adapter: unsupported type {}", other)),
        }
    }
}

impl FileAdapter {
    async fn file_read(&self, step: &Step) -> StepResult {
        let Some(path) = self.param_path(step, &["path", "file_path"]) else {
            return StepResult::failure("file_read: missing 'path' parameter");
        };
        match fs::read_to_string(&path).await {
            Ok(content) => {
                let mut result = StepResult::success(format!("read {} bytes", content.len()));
                result.data = Some(crate::model::StepResultData {
                    extra: [("content".to_string(), Value::String(content))].into(),
                    ..Default::default()
                });
                result
            }
            Err(e) => StepResult::failure(format!("file_read failed for {}: {}", path.display(), e)),
        }
    }

    async fn file_write(&self, step: &Step) -> StepResult {
        let Some(path) = self.param_path(step, &["path", "file_path", "save_path"]) else {
            return StepResult::failure("file_write: missing 'path' parameter");
        };
        let content = step
            .params
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or("");

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return StepResult::failure(format!("could not create parent dir: {}", e));
            }
        }

        match fs::write(&path, content).await {
            Ok(()) => StepResult::success(format!("wrote {} bytes to {}", content.len(), path.display())),
            Err(e) => StepResult::failure(format!("file_write failed for {}: {}", path.display(), e)),
        }
    }

    async fn file_delete(&self, step: &Step) -> StepResult {
        let Some(path) = self.param_path(step, &["path", "file_path"]) else {
            return StepResult::failure("file_delete: missing 'path' parameter");
        };
        let result = if path.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        match result {
            Ok(()) => StepResult::success(format!("deleted {}", path.display())),
            Err(e) => StepResult::failure(format!("file_delete failed for {}: {}", path.display(), e)),
        }
    }

    async fn file_rename(&self, step: &Step) -> StepResult {
        let Some(from) = self.param_path(step, &["path", "file_path"]) else {
            return StepResult::failure("file_rename: missing 'path' parameter");
        };
        let Some(Value::String(new_name)) = step.params.get("new_name") else {
            return StepResult::failure("file_rename: missing 'new_name' parameter");
        };
        let to = from
            .parent()
            .map(|p| p.join(new_name))
            .unwrap_or_else(|| PathBuf::from(new_name));
        match fs::rename(&from, &to).await {
            Ok(()) => StepResult::success(format!("renamed {} to {}", from.display(), to.display())),
            Err(e) => StepResult::failure(format!("file_rename failed: {}", e)),
        }
    }

    async fn file_move(&self, step: &Step) -> StepResult {
        let Some(from) = self.param_path(step, &["path", "file_path", "source"]) else {
            return StepResult::failure("file_move: missing source path parameter");
        };
        let Some(dir) = self.param_path(step, &["target_dir", "target_path", "destination"]) else {
            return StepResult::failure("file_move: missing 'target_dir' parameter");
        };
        if let Err(e) = fs::create_dir_all(&dir).await {
            return StepResult::failure(format!("could not create target dir: {}", e));
        }
        let file_name = from.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("moved"));
        let to = dir.join(file_name);
        match fs::rename(&from, &to).await {
            Ok(()) => StepResult::success(format!("moved {} to {}", from.display(), to.display())),
            Err(e) => StepResult::failure(format!("file_move failed: {}", e)),
        }
    }

    async fn file_copy(&self, step: &Step) -> StepResult {
        let Some(from) = self.param_path(step, &["path", "file_path", "source"]) else {
            return StepResult::failure("file_copy: missing source path parameter");
        };
        let Some(dir) = self.param_path(step, &["target_dir", "target_path", "destination"]) else {
            return StepResult::failure("file_copy: missing 'target_dir' parameter");
        };
        if let Err(e) = fs::create_dir_all(&dir).await {
            return StepResult::failure(format!("could not create target dir: {}", e));
        }
        let file_name = from.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("copy"));
        let to = dir.join(file_name);
        match fs::copy(&from, &to).await {
            Ok(bytes) => StepResult::success(format!("copied {} bytes to {}", bytes, to.display())),
            Err(e) => StepResult::failure(format!("file_copy failed: {}", e)),
        }
    }

    async fn list_files(&self, step: &Step) -> StepResult {
        let dir = self
            .param_path(step, &["directory", "path"])
            .unwrap_or_else(|| self.allowed_dir.clone());

        let mut entries = Vec::new();
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) => return StepResult::failure(format!("list_files failed for {}: {}", dir.display(), e)),
        };

        while let Ok(Some(entry)) = read_dir.next_entry().await {
            entries.push(entry.file_name().to_string_lossy().to_string());
        }
        debug!(dir = %dir.display(), count = entries.len(), "list_files");

        let mut result = StepResult::success(format!("listed {} entries in {}", entries.len(), dir.display()));
        result.data = Some(crate::model::StepResultData {
            extra: [("files".to_string(), json!(entries))].into(),
            ..Default::default()
        });
        result
    }

    async fn organize(&self, step: &Step) -> StepResult {
        let dir = self
            .param_path(step, &["directory", "path"])
            .unwrap_or_else(|| self.allowed_dir.clone());

        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) => return StepResult::failure(format!("file_organize failed for {}: {}", dir.display(), e)),
        };

        let mut moved = 0usize;
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("other")
                .to_lowercase();
            let bucket = dir.join(ext);
            if fs::create_dir_all(&bucket).await.is_err() {
                continue;
            }
            if let Some(name) = path.file_name() {
                if fs::rename(&path, bucket.join(name)).await.is_ok() {
                    moved += 1;
                }
            }
        }

        StepResult::success(format!("organized {} files in {} by extension", moved, dir.display()))
    }

    async fn classify(&self, step: &Step) -> StepResult {
        let Some(path) = self.param_path(step, &["path", "file_path"]) else {
            return StepResult::failure("file_classify: missing 'path' parameter");
        };
        let category = classify_by_extension(&path);
        let mut result = StepResult::success(format!("classified {} as {}", path.display(), category));
        result.data = Some(crate::model::StepResultData {
            extra: [("category".to_string(), Value::String(category.to_string()))].into(),
            ..Default::default()
        });
        result
    }

    async fn batch_rename(&self, step: &Step) -> StepResult {
        let dir = self
            .param_path(step, &["directory", "path"])
            .unwrap_or_else(|| self.allowed_dir.clone());
        let pattern = step
            .params
            .get("pattern")
            .and_then(Value::as_str)
            .unwrap_or("file_{n}");

        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) => return StepResult::failure(format!("file_batch_rename failed for {}: {}", dir.display(), e)),
        };

        let mut n = 0usize;
        let mut renamed = 0usize;
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str()).map(|e| format!(".{}", e)).unwrap_or_default();
            let new_name = format!("{}{}", pattern.replace("{n}", &n.to_string()), ext);
            if fs::rename(&path, dir.join(&new_name)).await.is_ok() {
                renamed += 1;
            }
            n += 1;
        }

        StepResult::success(format!("renamed {} files in {}", renamed, dir.display()))
    }

    async fn batch_copy(&self, step: &Step) -> StepResult {
        let Some(from_dir) = self.param_path(step, &["directory", "source"]) else {
            return StepResult::failure("file_batch_copy: missing 'directory' parameter");
        };
        let Some(to_dir) = self.param_path(step, &["target_dir", "destination"]) else {
            return StepResult::failure("file_batch_copy: missing 'target_dir' parameter");
        };
        if let Err(e) = fs::create_dir_all(&to_dir).await {
            return StepResult::failure(format!("could not create target dir: {}", e));
        }

        let mut read_dir = match fs::read_dir(&from_dir).await {
            Ok(rd) => rd,
            Err(e) => return StepResult::failure(format!("file_batch_copy failed for {}: {}", from_dir.display(), e)),
        };

        let mut copied = 0usize;
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name() {
                if fs::copy(&path, to_dir.join(name)).await.is_ok() {
                    copied += 1;
                }
            }
        }

        StepResult::success(format!("copied {} files from {} to {}", copied, from_dir.display(), to_dir.display()))
    }
}

fn classify_by_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
        Some(ext) if matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp") => "image",
        Some(ext) if matches!(ext.as_str(), "mp4" | "mov" | "avi" | "mkv") => "video",
        Some(ext) if matches!(ext.as_str(), "mp3" | "wav" | "flac" | "aac") => "audio",
        Some(ext) if matches!(ext.as_str(), "doc" | "docx" | "pdf" | "txt" | "md" | "xlsx" | "pptx") => "document",
        Some(ext) if matches!(ext.as_str(), "zip" | "tar" | "gz" | "7z" | "rar") => "archive",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Context;
    use tempfile::tempdir;

    fn ctx() -> Context {
        Context::new("2026-07-27T00:00:00Z")
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path().to_path_buf());

        let write_step = Step::new("file_write", "write")
            .with_param("path", Value::String("a.txt".into()))
            .with_param("content", Value::String("hello".into()));
        let result = adapter.execute(&write_step, &mut ctx()).await;
        assert!(result.success);

        let read_step = Step::new("file_read", "read").with_param("path", Value::String("a.txt".into()));
        let result = adapter.execute(&read_step, &mut ctx()).await;
        assert!(result.success);
        let content = result.data.unwrap().extra.get("content").unwrap().as_str().unwrap().to_string();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let dir = tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path().to_path_buf());
        std::fs::write(dir.path().join("b.txt"), "x").unwrap();

        let step = Step::new("file_delete", "delete").with_param("path", Value::String("b.txt".into()));
        let result = adapter.execute(&step, &mut ctx()).await;
        assert!(result.success);
        assert!(!dir.path().join("b.txt").exists());
    }

    #[tokio::test]
    async fn list_files_reports_entries() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("c.txt"), "x").unwrap();
        let adapter = FileAdapter::new(dir.path().to_path_buf());

        let step = Step::new("list_files", "list");
        let result = adapter.execute(&step, &mut ctx()).await;
        assert!(result.success);
        let files = result.data.unwrap().extra.get("files").unwrap().as_array().unwrap().len();
        assert_eq!(files, 1);
    }

    #[test]
    fn classify_detects_image() {
        assert_eq!(classify_by_extension(Path::new("photo.png")), "image");
        assert_eq!(classify_by_extension(Path::new("report.docx")), "document");
        assert_eq!(classify_by_extension(Path::new("unknown.xyz")), "other");
    }
}
