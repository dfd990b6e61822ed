//! Document chunking and the dual knowledge/FAQ vector store.

pub mod document;
pub mod error;
pub mod in_memory_store;
pub mod knowledge;
pub mod qdrant_ops;
pub mod types;
pub mod vector_store;

pub use document::splitter;
pub use error::MemoryError;
pub use in_memory_store::InMemoryVectorStore;
pub use knowledge::{KnowledgeStore, StoreSettings, StoreStats};
pub use qdrant_ops::QdrantOps;
pub use types::{FaqHit, KnowledgeHit, Metadata};
pub use vector_store::{IndexParams, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
