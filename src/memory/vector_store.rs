//! Vector memory — three append-only JSONL record logs (instructions,
//! conversations, summaries), each indexed in memory with `hnsw_rs` for
//! approximate nearest-neighbour search.
//!
//! Grounded in `original_source/agent/memory/vector_memory.py`'s
//! `VectorMemory`: same three collections, same `1/(1+distance)` similarity
//! conversion, and the same backup-rebuild-degrade failure recovery shape
//! around store initialization — reimplemented against a local
//! `hnsw_rs`/JSONL store instead of Chroma (see DESIGN.md).

use std::fmt;
use std::path::{Path, PathBuf};

use hnsw_rs::prelude::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::memory::cache::MemoryCache;
use crate::memory::embedding::EmbeddingProvider;
use crate::model::{CompactStep, ConversationVector, InstructionPatternVector};

/// Record logs smaller than this are searched by brute-force cosine scan;
/// larger ones get an `hnsw_rs` index built for the duration of the search.
/// Personal-agent memory rarely exceeds a few thousand entries, so most
/// searches stay on the brute-force path.
const BRUTE_FORCE_THRESHOLD: usize = 256;

trait EmbeddedRecord {
    fn id(&self) -> &str;
    fn embedding(&self) -> &[f32];
}

impl EmbeddedRecord for InstructionPatternVector {
    fn id(&self) -> &str {
        &self.id
    }
    fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

impl EmbeddedRecord for ConversationVector {
    fn id(&self) -> &str {
        &self.id
    }
    fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// Summary of a compressed time window, the third vector-memory collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryVector {
    pub id: String,
    pub window: String,
    pub summary_text: String,
    pub source_count: usize,
    pub timestamp: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl EmbeddedRecord for SummaryVector {
    fn id(&self) -> &str {
        &self.id
    }
    fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Outcome of loading one record log: either the records that parsed (with a
/// count of lines that didn't, which is tolerated — a few bad lines are not
/// "the store failed to open"), or `Corrupt` when the file has content but
/// not a single line parsed, which is treated as store corruption.
enum LoadOutcome<T> {
    Loaded(Vec<T>),
    Corrupt,
}

/// Load newline-delimited JSON records. A handful of unparsable lines are
/// skipped and logged; a file that is entirely unparsable is reported as
/// corrupt so the caller can back it up and rebuild (spec.md §4.10).
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> LoadOutcome<T> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return LoadOutcome::Loaded(Vec::new());
    };
    let mut records = Vec::new();
    let mut corrupt = 0usize;
    let mut total = 0usize;
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        total += 1;
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(_) => corrupt += 1,
        }
    }
    if total > 0 && records.is_empty() {
        return LoadOutcome::Corrupt;
    }
    if corrupt > 0 {
        warn!(path = %path.display(), corrupt, "vector memory: skipped unreadable record lines");
    }
    LoadOutcome::Loaded(records)
}

/// Current on-disk layout version. Bumping this forces `open_or_recover` to
/// treat an existing store directory as a version mismatch and rebuild it.
const STORE_VERSION: &str = "1";

/// Picks the directory `VectorMemory` should actually read/write. On a clean
/// store (matching version, all three logs readable) this is `base_dir`
/// unchanged. On a version mismatch or a corrupt log file, it backs up
/// `base_dir` to a sibling `<base_dir>_broken_<epoch>` directory (spec.md
/// §6.3) and returns a freshly created, empty `base_dir`. If even the backup
/// rename fails, returns `None` — the caller degrades to in-memory-only.
fn open_or_recover(base_dir: &Path) -> Option<PathBuf> {
    let version_path = base_dir.join("VERSION");
    let version_matches = std::fs::read_to_string(&version_path)
        .map(|v| v.trim() == STORE_VERSION)
        .unwrap_or(true); // no version file yet (fresh or pre-versioning store) — not a mismatch

    let logs_corrupt = ["instructions.jsonl", "conversations.jsonl", "summaries.jsonl"]
        .iter()
        .any(|name| matches!(load_jsonl::<serde_json::Value>(&base_dir.join(name)), LoadOutcome::Corrupt));

    if version_matches && !logs_corrupt {
        if let Err(e) = std::fs::write(&version_path, STORE_VERSION) {
            warn!(error = %e, path = %version_path.display(), "vector memory: could not write version marker");
        }
        return Some(base_dir.to_path_buf());
    }

    let epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let backup_dir = base_dir.with_file_name(format!(
        "{}_broken_{}",
        base_dir.file_name().and_then(|n| n.to_str()).unwrap_or("vector_memory"),
        epoch
    ));

    match std::fs::rename(base_dir, &backup_dir) {
        Ok(()) => {
            warn!(
                backup = %backup_dir.display(),
                "vector memory: store was corrupt or version-mismatched, backed up and rebuilding"
            );
            if let Err(e) = std::fs::create_dir_all(base_dir) {
                error!(error = %e, dir = %base_dir.display(), "vector memory: could not recreate store dir after backup, degrading to in-memory-only");
                return None;
            }
            if let Err(e) = std::fs::write(&version_path, STORE_VERSION) {
                warn!(error = %e, path = %version_path.display(), "vector memory: could not write version marker");
            }
            Some(base_dir.to_path_buf())
        }
        Err(e) => {
            error!(error = %e, dir = %base_dir.display(), "vector memory: could not back up corrupt store, degrading to in-memory-only");
            None
        }
    }
}

fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(record)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

fn rewrite_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }
    std::fs::write(path, buf)?;
    Ok(())
}

/// One append-only, in-memory-indexed record log. `path` is `None` when the
/// store degraded to in-memory-only (base dir could not be created or
/// recovered from corruption); writes then only update the in-memory copy.
struct VectorLog<T> {
    path: Option<PathBuf>,
    records: Mutex<Vec<T>>,
}

impl<T> VectorLog<T>
where
    T: EmbeddedRecord + Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn open(path: Option<PathBuf>) -> Self {
        let records = match &path {
            Some(p) => match load_jsonl(p) {
                LoadOutcome::Loaded(records) => records,
                // open_or_recover already backs up whole-store corruption
                // before this runs; a per-file corruption surfacing here
                // anyway (e.g. concurrent external edit) still shouldn't
                // block startup — start this log empty.
                LoadOutcome::Corrupt => {
                    error!(path = %p.display(), "vector memory: record log unreadable even after recovery pass, starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        VectorLog {
            path,
            records: Mutex::new(records),
        }
    }

    async fn append(&self, record: T) -> Result<()> {
        if let Some(path) = &self.path {
            append_jsonl(path, &record)?;
        }
        let mut records = self.records.lock().await;
        records.push(record);
        Ok(())
    }

    async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    async fn all(&self) -> Vec<T> {
        self.records.lock().await.clone()
    }

    /// Replace the in-memory and on-disk record set, e.g. after compression
    /// deletes the source records it summarized.
    async fn replace_all(&self, records: Vec<T>) -> Result<()> {
        if let Some(path) = &self.path {
            rewrite_jsonl(path, &records)?;
        }
        *self.records.lock().await = records;
        Ok(())
    }

    /// Top `limit` records by cosine similarity to `query_embedding`, paired
    /// with their similarity score, highest first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<(T, f32)> {
        if query_embedding.is_empty() || limit == 0 {
            return Vec::new();
        }
        let records = self.records.lock().await;
        if records.is_empty() {
            return Vec::new();
        }

        if records.len() <= BRUTE_FORCE_THRESHOLD {
            let mut scored: Vec<(T, f32)> = records
                .iter()
                .map(|r| (r.clone(), cosine_similarity(r.embedding(), query_embedding)))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(limit);
            return scored;
        }

        let max_layer = (records.len() as f32).log2().ceil().max(1.0) as usize;
        let hnsw = Hnsw::<f32, DistCosine>::new(16, records.len(), max_layer.min(16), 200, DistCosine {});
        for (idx, record) in records.iter().enumerate() {
            hnsw.insert((record.embedding(), idx));
        }
        let ef_search = (limit * 4).max(32);
        let neighbours = hnsw.search(query_embedding, limit, ef_search);
        neighbours
            .into_iter()
            .map(|n| {
                let similarity = 1.0 / (1.0 + n.distance);
                (records[n.d_id].clone(), similarity)
            })
            .collect()
    }
}

/// Vector memory: instruction patterns, conversation turns, and compressed
/// summaries, each searchable by embedding similarity. Degrades gracefully —
/// every read/write method stays infallible from the caller's perspective,
/// mirroring the teacher's "never throws" memory contract.
pub struct VectorMemory {
    instructions: VectorLog<InstructionPatternVector>,
    conversations: VectorLog<ConversationVector>,
    summaries: VectorLog<SummaryVector>,
    embedding: std::sync::Arc<EmbeddingProvider>,
    cache: MemoryCache,
}

impl fmt::Debug for VectorMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorMemory").finish_non_exhaustive()
    }
}

impl VectorMemory {
    /// Open (or create) the three collections under `base_dir`. A corrupt or
    /// version-mismatched store is backed up to a sibling
    /// `<base_dir>_broken_<epoch>` directory and rebuilt empty (spec.md
    /// §4.10, §6.3); if even that fails, the store degrades to
    /// in-memory-only rather than refusing to start.
    pub fn open(base_dir: &Path, embedding: std::sync::Arc<EmbeddingProvider>, cache: MemoryCache) -> Self {
        if let Err(e) = std::fs::create_dir_all(base_dir) {
            error!(error = %e, dir = %base_dir.display(), "vector memory: could not create store dir, degrading to in-memory-only");
        }

        let effective_dir = open_or_recover(base_dir);
        let log_path = |name: &str| effective_dir.as_ref().map(|d| d.join(name));

        VectorMemory {
            instructions: VectorLog::open(log_path("instructions.jsonl")),
            conversations: VectorLog::open(log_path("conversations.jsonl")),
            summaries: VectorLog::open(log_path("summaries.jsonl")),
            embedding,
            cache,
        }
    }

    pub async fn add_instruction_pattern(
        &self,
        instruction_text: &str,
        steps: &[CompactStep],
        success: bool,
        duration_s: f64,
        files: Vec<String>,
        timestamp: &str,
    ) -> Result<()> {
        let embedding = self.embedding.encode(instruction_text).await;
        let record = InstructionPatternVector {
            id: Uuid::new_v4().to_string(),
            instruction_text: instruction_text.to_string(),
            compact_steps: steps.to_vec(),
            success,
            duration_s,
            files,
            timestamp: timestamp.to_string(),
            embedding,
        };
        self.instructions.append(record).await?;
        self.cache.invalidate_search_results().await;
        Ok(())
    }

    /// Nearest instruction patterns above `min_similarity` (spec default 0.7).
    pub async fn find_similar_instructions(
        &self,
        instruction: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Vec<(InstructionPatternVector, f32)> {
        if let Some(cached) = self.cache.get_search_results("instructions", instruction).await {
            return cached
                .into_iter()
                .filter_map(|v| serde_json::from_value::<(InstructionPatternVector, f32)>(v).ok())
                .collect();
        }

        let query_embedding = self.embedding.encode(instruction).await;
        let hits: Vec<(InstructionPatternVector, f32)> = self
            .instructions
            .search(&query_embedding, limit)
            .await
            .into_iter()
            .filter(|(_, score)| *score >= min_similarity)
            .collect();

        let cacheable: Vec<serde_json::Value> = hits
            .iter()
            .filter_map(|pair| serde_json::to_value(pair).ok())
            .collect();
        self.cache.put_search_results("instructions", instruction, cacheable).await;
        hits
    }

    pub async fn add_conversation(
        &self,
        user_message: &str,
        response_preview: &str,
        session_id: &str,
        emotion: Option<String>,
        success: bool,
        timestamp: &str,
    ) -> Result<()> {
        let embedding = self.embedding.encode(user_message).await;
        let record = ConversationVector {
            id: Uuid::new_v4().to_string(),
            user_message: user_message.to_string(),
            response_preview: response_preview.to_string(),
            session_id: session_id.to_string(),
            emotion,
            success,
            timestamp: timestamp.to_string(),
            embedding,
        };
        self.conversations.append(record).await?;
        self.cache.invalidate_search_results().await;
        Ok(())
    }

    pub async fn search_conversations(
        &self,
        query: &str,
        limit: usize,
        filter_success: Option<bool>,
    ) -> Vec<(ConversationVector, f32)> {
        let query_embedding = self.embedding.encode(query).await;
        self.conversations
            .search(&query_embedding, limit * 2)
            .await
            .into_iter()
            .filter(|(record, _)| filter_success.map(|want| record.success == want).unwrap_or(true))
            .take(limit)
            .collect()
    }

    pub async fn search_summaries(&self, query: &str, limit: usize) -> Vec<(SummaryVector, f32)> {
        let query_embedding = self.embedding.encode(query).await;
        self.summaries.search(&query_embedding, limit).await
    }

    /// Assembles a context block from all three collections for the planner
    /// prompt, blank-line separated. Empty collections contribute nothing.
    pub async fn get_memory_context(&self, query: &str, limit: usize) -> String {
        let mut parts = Vec::new();

        let conversations = self.search_conversations(query, limit, None).await;
        if !conversations.is_empty() {
            let lines: Vec<String> = conversations
                .iter()
                .map(|(c, score)| format!("- ({:.2}) {} -> {}", score, c.user_message, c.response_preview))
                .collect();
            parts.push(format!("**related conversations**:\n{}", lines.join("\n")));
        }

        let instructions = self.find_similar_instructions(query, limit, 0.5).await;
        if !instructions.is_empty() {
            let lines: Vec<String> = instructions
                .iter()
                .map(|(i, score)| format!("- ({:.2}) {} [{}]", score, i.instruction_text, if i.success { "ok" } else { "failed" }))
                .collect();
            parts.push(format!("**similar past instructions**:\n{}", lines.join("\n")));
        }

        let summaries = self.search_summaries(query, limit).await;
        if !summaries.is_empty() {
            let lines: Vec<String> = summaries.iter().map(|(s, _)| format!("- {}", s.summary_text)).collect();
            parts.push(format!("**recent summaries**:\n{}", lines.join("\n")));
        }

        parts.join("\n\n")
    }

    /// Conversations whose `timestamp` falls within `window` (an RFC3339
    /// date prefix, e.g. "2026-07-27" for a day window). Callers use this to
    /// build a summary (naively, or via an LLM) before calling
    /// `compress_window`.
    pub async fn conversations_in_window(&self, window: &str) -> Vec<ConversationVector> {
        self.conversations
            .all()
            .await
            .into_iter()
            .filter(|c| c.timestamp.starts_with(window))
            .collect()
    }

    /// Distinct day-prefixes (`YYYY-MM-DD`) among conversations whose
    /// timestamp sorts strictly before `cutoff_date`, oldest first. Used by
    /// the background compression worker to find windows worth summarizing.
    pub async fn stale_windows(&self, cutoff_date: &str) -> Vec<String> {
        let mut windows: Vec<String> = self
            .conversations
            .all()
            .await
            .into_iter()
            .filter_map(|c| c.timestamp.get(0..10).map(|d| d.to_string()))
            .filter(|d| d.as_str() < cutoff_date)
            .collect();
        windows.sort();
        windows.dedup();
        windows
    }

    /// Replaces every conversation in `window` with one summary record
    /// holding `summary_text`, and returns how many were compressed.
    pub async fn compress_window(&self, window: &str, summary_text: String) -> Result<usize> {
        let all = self.conversations.all().await;
        let (matching, remaining): (Vec<_>, Vec<_>) = all.into_iter().partition(|c| c.timestamp.starts_with(window));

        if matching.is_empty() {
            return Ok(0);
        }

        let embedding = self.embedding.encode(&summary_text).await;
        let record = SummaryVector {
            id: Uuid::new_v4().to_string(),
            window: window.to_string(),
            summary_text,
            source_count: matching.len(),
            timestamp: window.to_string(),
            embedding,
        };
        self.summaries.append(record).await?;
        self.conversations.replace_all(remaining).await?;
        self.cache.invalidate_search_results().await;
        Ok(matching.len())
    }

    pub async fn instruction_count(&self) -> usize {
        self.instructions.len().await
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> std::sync::Arc<EmbeddingProvider> {
        std::sync::Arc::new(EmbeddingProvider::new())
    }

    #[tokio::test]
    async fn cosine_similarity_identical_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn cosine_similarity_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[tokio::test]
    async fn compress_memories_replaces_matching_window() {
        let dir = std::env::temp_dir().join(format!("taskagent-vecmem-{}", Uuid::new_v4()));
        let store = VectorMemory::open(&dir, provider(), MemoryCache::new());
        store
            .add_conversation("hello", "hi there", "s1", None, true, "2026-07-27T10:00:00Z")
            .await
            .unwrap();
        store
            .add_conversation("bye", "goodbye", "s1", None, true, "2026-07-26T10:00:00Z")
            .await
            .unwrap();

        let window_batch = store.conversations_in_window("2026-07-27").await;
        let summary_text = format!("{} conversation(s) summarized", window_batch.len());
        let compressed = store.compress_window("2026-07-27", summary_text).await.unwrap();
        assert_eq!(compressed, 1);
        assert_eq!(store.conversation_count().await, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_store_is_backed_up_and_rebuilt_empty() {
        let dir = std::env::temp_dir().join(format!("taskagent-vecmem-corrupt-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("instructions.jsonl"), "not json\nnot json either\n").unwrap();

        let store = VectorMemory::open(&dir, provider(), MemoryCache::new());
        assert_eq!(store.instruction_count().await, 0);

        let dir_name = dir.file_name().and_then(|n| n.to_str()).unwrap();
        let parent = dir.parent().unwrap();
        let backed_up = std::fs::read_dir(parent)
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n.starts_with(&format!("{}_broken_", dir_name)))
                    .unwrap_or(false)
            });
        assert!(backed_up, "expected a <dir>_broken_<epoch> backup next to the rebuilt store");

        // the freshly rebuilt store is writable
        store
            .add_instruction_pattern("open safari", &[], true, 0.1, Vec::new(), "2026-07-30T00:00:00Z")
            .await
            .unwrap();
        assert_eq!(store.instruction_count().await, 1);

        let _ = std::fs::remove_dir_all(&dir);
        for entry in std::fs::read_dir(parent).unwrap().flatten() {
            if entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with(&format!("{}_broken_", dir_name)))
                .unwrap_or(false)
            {
                let _ = std::fs::remove_dir_all(entry.path());
            }
        }
    }

    #[tokio::test]
    async fn version_mismatch_triggers_backup_and_rebuild() {
        let dir = std::env::temp_dir().join(format!("taskagent-vecmem-ver-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("VERSION"), "0").unwrap();
        std::fs::write(
            dir.join("instructions.jsonl"),
            r#"{"id":"a","instruction_text":"x","compact_steps":[],"success":true,"duration_s":0.1,"files":[],"timestamp":"2026-07-29T00:00:00Z","embedding":[]}"#,
        )
        .unwrap();

        let store = VectorMemory::open(&dir, provider(), MemoryCache::new());
        assert_eq!(store.instruction_count().await, 0);
        assert_eq!(std::fs::read_to_string(dir.join("VERSION")).unwrap().trim(), STORE_VERSION);

        let dir_name = dir.file_name().and_then(|n| n.to_str()).unwrap();
        let parent = dir.parent().unwrap();
        for entry in std::fs::read_dir(parent).unwrap().flatten() {
            if entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with(&format!("{}_broken_", dir_name)))
                .unwrap_or(false)
            {
                let _ = std::fs::remove_dir_all(entry.path());
            }
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
