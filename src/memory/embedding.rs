//! Shared embedding provider — single process-wide instance.
//!
//! Grounded in `original_source/agent/core/embedding_model.py`'s
//! `SharedEmbeddingModel`: a background worker loads the model once,
//! `wait_until_ready` blocks callers up to a timeout, and `encode` never
//! throws — it degrades to an empty vector when the model isn't ready or
//! failed to load. The Python original signals readiness with a
//! `threading.Event`; `tokio::sync::watch` is this workspace's async
//! equivalent (spec.md §5: "shared state guarded by a mutex plus an
//! event/condition variable").

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    NotStarted,
    Loading,
    Ready,
    Failed,
}

/// Process-wide embedding provider. Construct once in the composition root
/// and share via `Arc` with the intent router and vector memory.
pub struct EmbeddingProvider {
    model: Arc<StdMutex<Option<TextEmbedding>>>,
    state_tx: watch::Sender<LoadState>,
    state_rx: watch::Receiver<LoadState>,
}

impl EmbeddingProvider {
    pub fn new() -> Self {
        let (state_tx, state_rx) = watch::channel(LoadState::NotStarted);
        EmbeddingProvider {
            model: Arc::new(StdMutex::new(None)),
            state_tx,
            state_rx,
        }
    }

    /// Trigger a background load if one hasn't started yet. Safe to call
    /// more than once; only the first call spawns a worker.
    pub fn start_loading(&self) {
        {
            let current = *self.state_rx.borrow();
            if current != LoadState::NotStarted {
                return;
            }
        }
        let _ = self.state_tx.send(LoadState::Loading);

        let model = Arc::clone(&self.model);
        let state_tx = self.state_tx.clone();
        tokio::task::spawn_blocking(move || {
            info!("embedding provider: loading multilingual-e5-small");
            let start = std::time::Instant::now();
            let init =
                InitOptions::new(EmbeddingModel::MultilingualE5Small).with_show_download_progress(false);
            match TextEmbedding::try_new(init) {
                Ok(loaded) => {
                    *model.lock().unwrap() = Some(loaded);
                    info!(elapsed_s = start.elapsed().as_secs_f64(), "embedding provider: ready");
                    let _ = state_tx.send(LoadState::Ready);
                }
                Err(e) => {
                    error!(error = %e, "embedding provider: load failed");
                    let _ = state_tx.send(LoadState::Failed);
                }
            }
        });
    }

    /// Block up to `timeout` for the model to finish loading. Returns
    /// `true` once ready, `false` on timeout or load failure.
    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        if *self.state_rx.borrow() == LoadState::Ready {
            return true;
        }
        self.start_loading();

        let mut rx = self.state_rx.clone();
        let wait = async {
            loop {
                if *rx.borrow() == LoadState::Ready {
                    return true;
                }
                if *rx.borrow() == LoadState::Failed {
                    return false;
                }
                if rx.changed().await.is_err() {
                    return false;
                }
            }
        };

        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }

    /// Dimensionality of `multilingual-e5-small` embeddings.
    pub fn dimensions(&self) -> usize {
        384
    }

    /// Encode `text`. Never errors: returns an empty vector if the model is
    /// not ready within a short internal wait, or if inference fails.
    pub async fn encode(&self, text: &str) -> Vec<f32> {
        if !self.wait_until_ready(Duration::from_secs(5)).await {
            return Vec::new();
        }

        let model = Arc::clone(&self.model);
        let text = text.to_string();
        let result = tokio::task::spawn_blocking(move || {
            let guard = model.lock().unwrap();
            let Some(m) = guard.as_ref() else {
                return Err("embedding model not loaded".to_string());
            };
            m.embed(vec![text], None).map_err(|e| e.to_string())
        })
        .await;

        match result {
            Ok(Ok(mut vectors)) => vectors.pop().unwrap_or_default(),
            Ok(Err(e)) => {
                error!(error = %e, "embedding provider: inference failed");
                Vec::new()
            }
            Err(e) => {
                error!(error = %e, "embedding provider: worker panicked");
                Vec::new()
            }
        }
    }
}

impl Default for EmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_started_by_default() {
        let provider = EmbeddingProvider::new();
        assert_eq!(*provider.state_rx.borrow(), LoadState::NotStarted);
    }

    #[test]
    fn dimensions_is_384() {
        let provider = EmbeddingProvider::new();
        assert_eq!(provider.dimensions(), 384);
    }
}
