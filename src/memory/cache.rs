//! In-process caching for embeddings and vector-memory search results.
//!
//! Uses `moka`'s async cache (Send + Sync, TTL-based eviction); no external
//! services required. Generalized from the teacher's `database::Memory`
//! coupling: search results are cached as opaque JSON so any vector-memory
//! collection (instructions, conversations, summaries) can share one cache.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;

fn hash_key(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// In-process cache shared by the embedding provider and vector memory.
#[derive(Clone)]
pub struct MemoryCache {
    /// Embedding cache: hash(text) -> Vec<f32>
    embeddings: Cache<u64, Vec<f32>>,
    /// Search result cache: hash(collection + query) -> results (as JSON)
    search_results: Cache<u64, Vec<Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache {
            embeddings: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(30 * 60))
                .build(),
            search_results: Cache::builder()
                .max_capacity(500)
                .time_to_live(Duration::from_secs(5 * 60))
                .build(),
        }
    }

    pub async fn get_embedding(&self, text: &str) -> Option<Vec<f32>> {
        self.embeddings.get(&hash_key(text)).await
    }

    pub async fn put_embedding(&self, text: &str, embedding: Vec<f32>) {
        self.embeddings.insert(hash_key(text), embedding).await;
    }

    pub async fn get_search_results(&self, collection: &str, query: &str) -> Option<Vec<Value>> {
        let key = format!("{}:{}", collection, query);
        self.search_results.get(&hash_key(&key)).await
    }

    pub async fn put_search_results(&self, collection: &str, query: &str, results: Vec<Value>) {
        let key = format!("{}:{}", collection, query);
        self.search_results.insert(hash_key(&key), results).await;
    }

    /// Invalidate all cached search results, e.g. after a write to any
    /// collection. Moka has no prefix-based invalidation; with a 5-minute
    /// TTL, invalidating everything is cheap enough to do on every write.
    pub async fn invalidate_search_results(&self) {
        self.search_results.invalidate_all();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedding_cache_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.get_embedding("hello").await.is_none());
        cache.put_embedding("hello", vec![0.1, 0.2, 0.3]).await;
        let result = cache.get_embedding("hello").await;
        assert_eq!(result.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn search_cache_round_trip() {
        let cache = MemoryCache::new();
        cache
            .put_search_results("instructions", "open safari", vec![serde_json::json!({"id": "1"})])
            .await;
        let hit = cache.get_search_results("instructions", "open safari").await;
        assert_eq!(hit.unwrap().len(), 1);
        cache.invalidate_search_results().await;
    }
}
