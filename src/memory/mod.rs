//! Memory — structured (sqlite) facts and vector (embedding-indexed)
//! recall, plus the embedding provider and cache shared by both.

pub mod cache;
pub mod embedding;
pub mod maintenance;
pub mod structured;
pub mod summarizer;
pub mod vector_store;

pub use cache::MemoryCache;
pub use embedding::EmbeddingProvider;
pub use maintenance::spawn_compression_worker;
pub use structured::StructuredMemory;
pub use summarizer::ConversationSummarizer;
pub use vector_store::{SummaryVector, VectorMemory};
