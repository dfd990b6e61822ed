use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("collection error: {0}")]
    Collection(String),
    #[error("collection {collection} not found")]
    CollectionMissing { collection: String },
    #[error("collection {collection} has vector size {actual}, expected {expected}")]
    DimensionMismatch {
        collection: String,
        expected: u64,
        actual: u64,
    },
    #[error("upsert error: {0}")]
    Upsert(String),
    #[error("search error: {0}")]
    Search(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// HNSW build and search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexParams {
    pub m: u64,
    pub ef_construct: u64,
    pub ef_search: u64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            m: 8,
            ef_construct: 64,
            ef_search: 64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Cosine-distance vector collections.
pub trait VectorStore: Send + Sync {
    /// Create `collection` if absent. An existing collection with a different
    /// vector size is a [`VectorStoreError::DimensionMismatch`].
    fn ensure_collection<'a>(
        &'a self,
        collection: &'a str,
        vector_size: u64,
        index: &'a IndexParams,
    ) -> BoxFuture<'a, Result<(), VectorStoreError>>;

    fn collection_exists<'a>(
        &'a self,
        collection: &'a str,
    ) -> BoxFuture<'a, Result<bool, VectorStoreError>>;

    fn delete_collection<'a>(
        &'a self,
        collection: &'a str,
    ) -> BoxFuture<'a, Result<(), VectorStoreError>>;

    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'a, Result<(), VectorStoreError>>;

    /// Nearest neighbours by descending score, at most `limit` of them.
    ///
    /// Searching a collection that does not exist is a
    /// [`VectorStoreError::CollectionMissing`].
    fn search<'a>(
        &'a self,
        collection: &'a str,
        vector: Vec<f32>,
        limit: u64,
        score_threshold: Option<f32>,
    ) -> BoxFuture<'a, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;

    fn count<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<u64, VectorStoreError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_index_params() {
        let p = IndexParams::default();
        assert_eq!((p.m, p.ef_construct, p.ef_search), (8, 64, 64));
    }

    #[test]
    fn dimension_mismatch_display() {
        let err = VectorStoreError::DimensionMismatch {
            collection: "knowledge_store".into(),
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            err.to_string(),
            "collection knowledge_store has vector size 768, expected 384"
        );
    }
}
