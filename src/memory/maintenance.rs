//! Background vector-memory maintenance — periodic `compress_memories`.
//!
//! Grounded in `original_source/agent/memory/vector_memory.py`'s
//! `compress_memories`: group conversations older than a cutoff by their
//! date prefix, summarize each group (LLM summarizer when configured, else
//! the deterministic fallback), store the summary, and delete the
//! originals. The Python original exposes this as a method callers invoke
//! manually and never schedules it; spec.md §5 sanctions a background
//! worker for "vector-store automatic maintenance if any", so this
//! workspace runs it on a fixed interval the way `embedding::EmbeddingProvider`
//! runs its own background load.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::memory::summarizer::{naive_summary, ConversationSummarizer};
use crate::memory::vector_store::VectorMemory;

/// Conversations older than this many days (by date prefix) are compressed.
const COMPRESSION_CUTOFF_DAYS: i64 = 1;

/// Spawns a task that wakes every `interval` and compresses any
/// conversation windows older than a day, for the lifetime of the process.
pub fn spawn_compression_worker(
    vector_memory: Arc<VectorMemory>,
    summarizer: Option<Arc<ConversationSummarizer>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; a fresh store has nothing worth compressing yet
        loop {
            ticker.tick().await;
            run_once(&vector_memory, summarizer.as_deref()).await;
        }
    })
}

async fn run_once(vector_memory: &VectorMemory, summarizer: Option<&ConversationSummarizer>) {
    let cutoff = (chrono::Utc::now() - chrono::Duration::days(COMPRESSION_CUTOFF_DAYS))
        .format("%Y-%m-%d")
        .to_string();

    for window in vector_memory.stale_windows(&cutoff).await {
        let conversations = vector_memory.conversations_in_window(&window).await;
        if conversations.is_empty() {
            continue;
        }
        let summary_text = match summarizer {
            Some(s) => s.summarize(&conversations).await,
            None => naive_summary(&conversations),
        };
        match vector_memory.compress_window(&window, summary_text).await {
            Ok(count) => info!(window = %window, count, "vector memory: compressed stale conversations"),
            Err(e) => warn!(error = %e, window = %window, "vector memory: compression failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::cache::MemoryCache;
    use crate::memory::embedding::EmbeddingProvider;
    use uuid::Uuid;

    #[tokio::test]
    async fn run_once_compresses_only_stale_windows() {
        let dir = std::env::temp_dir().join(format!("taskagent-maint-{}", Uuid::new_v4()));
        let embedding = Arc::new(EmbeddingProvider::new());
        let store = Arc::new(VectorMemory::open(&dir, embedding, MemoryCache::new()));

        let old_date = (chrono::Utc::now() - chrono::Duration::days(5)).format("%Y-%m-%d").to_string();
        let recent_date = chrono::Utc::now().format("%Y-%m-%d").to_string();

        store
            .add_conversation("old one", "handled", "s1", None, true, &format!("{}T00:00:00Z", old_date))
            .await
            .unwrap();
        store
            .add_conversation("recent one", "handled", "s1", None, true, &format!("{}T00:00:00Z", recent_date))
            .await
            .unwrap();

        run_once(&store, None).await;

        assert_eq!(store.conversation_count().await, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
