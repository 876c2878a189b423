//! Intent Router — embedding-similarity fast path that classifies an
//! instruction into a single-step plan without invoking the planner.
//!
//! Grounded in `original_source/agent/core/intent_router.py`'s
//! `IntentRouter`: per-intent cosine similarity against canonical examples,
//! taking the max per intent, then the global argmax, gated by a
//! similarity threshold (default 0.65).

pub mod app_name;
pub mod catalog;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::memory::embedding::EmbeddingProvider;
use crate::model::{IntentMatch, IntentMetadata};
use catalog::INTENT_CATALOG;

/// Default similarity threshold below which `detect` degrades to `None`
/// (falling through to the full planner), matching the Python original.
pub const DEFAULT_THRESHOLD: f32 = 0.65;

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

pub struct IntentRouter {
    embedding: Arc<EmbeddingProvider>,
    example_embeddings: OnceCell<HashMap<&'static str, Vec<Vec<f32>>>>,
}

impl IntentRouter {
    pub fn new(embedding: Arc<EmbeddingProvider>) -> Self {
        IntentRouter {
            embedding,
            example_embeddings: OnceCell::new(),
        }
    }

    async fn cached_embeddings(&self) -> &HashMap<&'static str, Vec<Vec<f32>>> {
        self.example_embeddings
            .get_or_init(|| async {
                let mut map = HashMap::new();
                for def in INTENT_CATALOG {
                    let mut vectors = Vec::with_capacity(def.examples.len());
                    for example in def.examples {
                        let vector = self.embedding.encode(example).await;
                        if !vector.is_empty() {
                            vectors.push(vector);
                        }
                    }
                    if !vectors.is_empty() {
                        map.insert(def.intent_type, vectors);
                    }
                }
                map
            })
            .await
    }

    /// Classify `text`, or return `None` if no intent clears `threshold` or
    /// the embedding model isn't ready.
    pub async fn detect(&self, text: &str, threshold: f32) -> Option<IntentMatch> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let embeddings = self.cached_embeddings().await;
        if embeddings.is_empty() {
            return None;
        }

        let query = self.embedding.encode(text).await;
        if query.is_empty() {
            return None;
        }

        let mut best_intent: Option<&'static str> = None;
        let mut best_score = f32::MIN;

        for def in INTENT_CATALOG {
            let Some(examples) = embeddings.get(def.intent_type) else {
                continue;
            };
            let max_score = examples
                .iter()
                .map(|example| cosine_similarity(example, &query))
                .fold(f32::MIN, f32::max);

            if max_score > best_score {
                best_score = max_score;
                best_intent = Some(def.intent_type);
            }
        }

        let intent_type = best_intent?;
        if best_score < threshold {
            return None;
        }

        let def = INTENT_CATALOG.iter().find(|d| d.intent_type == intent_type)?;
        Some(IntentMatch {
            intent_type: intent_type.to_string(),
            confidence: best_score,
            metadata: IntentMetadata {
                step_type: def.step_type.to_string(),
                action: def.action.to_string(),
                default_params: HashMap::new(),
            },
            is_fast_path: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_empty_is_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn cosine_similarity_orthogonal_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }
}
