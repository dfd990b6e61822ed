//! Knowledge and FAQ collections over one [`VectorStore`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sage_llm::EmbeddingProvider;

use crate::error::MemoryError;
use crate::types::{FaqHit, KnowledgeHit, Metadata, parse_metadata};
use crate::vector_store::{IndexParams, ScoredVectorPoint, VectorPoint, VectorStore};

pub const DEFAULT_KNOWLEDGE_COLLECTION: &str = "knowledge_store";
pub const DEFAULT_FAQ_COLLECTION: &str = "faq_store";

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub knowledge_collection: String,
    pub faq_collection: String,
    pub index: IndexParams,
    /// Minimum cosine score for search hits; `None` keeps everything.
    pub score_threshold: Option<f32>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            knowledge_collection: DEFAULT_KNOWLEDGE_COLLECTION.into(),
            faq_collection: DEFAULT_FAQ_COLLECTION.into(),
            index: IndexParams::default(),
            score_threshold: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub knowledge: u64,
    pub faq: u64,
}

/// Stores free-text knowledge chunks and question/answer pairs in two
/// collections that share one embedding space.
///
/// FAQ entries are embedded over the question only. After [`close`](Self::close)
/// every operation fails with [`MemoryError::NotConnected`].
pub struct KnowledgeStore {
    backend: RwLock<Option<Arc<dyn VectorStore>>>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: StoreSettings,
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("embedder", &self.embedder.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl KnowledgeStore {
    #[must_use]
    pub fn new(
        backend: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            backend: RwLock::new(Some(backend)),
            embedder,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    fn backend(&self) -> Result<Arc<dyn VectorStore>, MemoryError> {
        self.backend
            .read()
            .map_err(|e| MemoryError::Other(e.to_string()))?
            .clone()
            .ok_or(MemoryError::NotConnected)
    }

    /// Create both collections with the embedder's dimension.
    ///
    /// # Errors
    ///
    /// Fails with a dimension mismatch when a collection already exists with a
    /// different vector size, or when the backend is unreachable.
    pub async fn init(&self) -> Result<(), MemoryError> {
        let backend = self.backend()?;
        let dimension = self.embedder.dimension() as u64;
        for collection in [
            &self.settings.knowledge_collection,
            &self.settings.faq_collection,
        ] {
            backend
                .ensure_collection(collection, dimension, &self.settings.index)
                .await?;
        }
        tracing::info!(
            knowledge = %self.settings.knowledge_collection,
            faq = %self.settings.faq_collection,
            dimension,
            embedder = self.embedder.name(),
            "knowledge store ready"
        );
        Ok(())
    }

    /// Embed and store one knowledge chunk, returning its fresh id.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the upsert fails.
    pub async fn store_knowledge(
        &self,
        content: &str,
        metadata: &Metadata,
    ) -> Result<String, MemoryError> {
        let backend = self.backend()?;
        let vector = self.embedder.embed(content).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let payload = HashMap::from([
            ("text".to_owned(), serde_json::Value::String(content.to_owned())),
            (
                "metadata".to_owned(),
                serde_json::Value::String(serde_json::to_string(metadata)?),
            ),
        ]);
        backend
            .upsert(
                &self.settings.knowledge_collection,
                vec![VectorPoint {
                    id: id.clone(),
                    vector,
                    payload,
                }],
            )
            .await?;
        tracing::debug!(id = %id, chars = content.chars().count(), "stored knowledge");
        Ok(id)
    }

    /// Store a question/answer pair, embedding the question only.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the upsert fails.
    pub async fn store_faq(
        &self,
        question: &str,
        answer: &str,
        metadata: &Metadata,
    ) -> Result<String, MemoryError> {
        let backend = self.backend()?;
        let vector = self.embedder.embed(question).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let payload = HashMap::from([
            ("question".to_owned(), serde_json::Value::String(question.to_owned())),
            ("answer".to_owned(), serde_json::Value::String(answer.to_owned())),
            (
                "metadata".to_owned(),
                serde_json::Value::String(serde_json::to_string(metadata)?),
            ),
        ]);
        backend
            .upsert(
                &self.settings.faq_collection,
                vec![VectorPoint {
                    id: id.clone(),
                    vector,
                    payload,
                }],
            )
            .await?;
        tracing::debug!(id = %id, "stored faq");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns an error if embedding or the search fails.
    pub async fn search_knowledge(
        &self,
        query: &str,
        size: usize,
    ) -> Result<Vec<KnowledgeHit>, MemoryError> {
        let points = self
            .search(&self.settings.knowledge_collection, query, size)
            .await?;
        Ok(points
            .into_iter()
            .map(|p| KnowledgeHit {
                content: payload_str(&p, "text"),
                score: p.score,
                metadata: parse_metadata(&payload_str(&p, "metadata")),
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error if embedding or the search fails.
    pub async fn search_faq(&self, query: &str, size: usize) -> Result<Vec<FaqHit>, MemoryError> {
        let points = self
            .search(&self.settings.faq_collection, query, size)
            .await?;
        Ok(points
            .into_iter()
            .map(|p| FaqHit {
                question: payload_str(&p, "question"),
                answer: payload_str(&p, "answer"),
                score: p.score,
                metadata: parse_metadata(&payload_str(&p, "metadata")),
            })
            .collect())
    }

    async fn search(
        &self,
        collection: &str,
        query: &str,
        size: usize,
    ) -> Result<Vec<ScoredVectorPoint>, MemoryError> {
        let backend = self.backend()?;
        if size == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query).await?;
        let points = backend
            .search(
                collection,
                vector,
                size as u64,
                self.settings.score_threshold,
            )
            .await?;
        tracing::debug!(collection, hits = points.len(), "search complete");
        Ok(points)
    }

    /// # Errors
    ///
    /// Returns an error if either collection cannot be counted.
    pub async fn stats(&self) -> Result<StoreStats, MemoryError> {
        let backend = self.backend()?;
        Ok(StoreStats {
            knowledge: backend.count(&self.settings.knowledge_collection).await?,
            faq: backend.count(&self.settings.faq_collection).await?,
        })
    }

    /// Release the backend handle. Safe to call more than once.
    pub fn close(&self) {
        match self.backend.write() {
            Ok(mut guard) => {
                if guard.take().is_some() {
                    tracing::debug!("knowledge store closed");
                }
            }
            Err(e) => tracing::warn!("knowledge store lock poisoned on close: {e}"),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.backend.read().map_or(true, |b| b.is_none())
    }
}

fn payload_str(point: &ScoredVectorPoint, key: &str) -> String {
    point
        .payload
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory_store::InMemoryVectorStore;
    use crate::vector_store::VectorStoreError;
    use sage_llm::HashingEmbedder;

    async fn store() -> KnowledgeStore {
        let s = KnowledgeStore::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(HashingEmbedder::new(128)),
            StoreSettings::default(),
        );
        s.init().await.unwrap();
        s
    }

    #[tokio::test]
    async fn store_then_search_knowledge() {
        let s = store().await;
        let mut meta = Metadata::new();
        meta.insert("title".into(), "geo".into());
        let content = "Paris is the capital of France.";
        let id = s.store_knowledge(content, &meta).await.unwrap();
        assert!(!id.is_empty());

        let hits = s.search_knowledge(content, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, content);
        assert!(hits[0].score >= 0.9);
        assert_eq!(hits[0].metadata["title"], "geo");
    }

    #[tokio::test]
    async fn store_then_search_faq_matches_on_question() {
        let s = store().await;
        s.store_faq("What is 2+2?", "4", &Metadata::new())
            .await
            .unwrap();
        s.store_faq("Who wrote Hamlet?", "Shakespeare", &Metadata::new())
            .await
            .unwrap();

        let hits = s.search_faq("2+2", 5).await.unwrap();
        assert_eq!(hits[0].question, "What is 2+2?");
        assert_eq!(hits[0].answer, "4");
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let s = store().await;
        let a = s.store_knowledge("same", &Metadata::new()).await.unwrap();
        let b = s.store_knowledge("same", &Metadata::new()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(s.stats().await.unwrap().knowledge, 2);
    }

    #[tokio::test]
    async fn search_never_exceeds_size() {
        let s = store().await;
        for i in 0..5 {
            s.store_knowledge(&format!("fact number {i}"), &Metadata::new())
                .await
                .unwrap();
        }
        assert_eq!(s.search_knowledge("fact", 3).await.unwrap().len(), 3);
        assert!(s.search_knowledge("fact", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_collection_returns_empty() {
        let s = store().await;
        assert!(s.search_faq("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_before_init_is_collection_missing() {
        let s = KnowledgeStore::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(HashingEmbedder::new(8)),
            StoreSettings::default(),
        );
        let err = s.search_knowledge("q", 5).await.unwrap_err();
        assert!(matches!(
            err,
            MemoryError::VectorStore(VectorStoreError::CollectionMissing { .. })
        ));
    }

    #[tokio::test]
    async fn init_with_other_dimension_fails() {
        let backend: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        KnowledgeStore::new(
            Arc::clone(&backend),
            Arc::new(HashingEmbedder::new(8)),
            StoreSettings::default(),
        )
        .init()
        .await
        .unwrap();

        let err = KnowledgeStore::new(
            backend,
            Arc::new(HashingEmbedder::new(16)),
            StoreSettings::default(),
        )
        .init()
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            MemoryError::VectorStore(VectorStoreError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn operations_after_close_fail() {
        let s = store().await;
        s.close();
        s.close();
        assert!(s.is_closed());
        assert!(matches!(
            s.store_knowledge("x", &Metadata::new()).await,
            Err(MemoryError::NotConnected)
        ));
        assert!(matches!(
            s.search_faq("x", 5).await,
            Err(MemoryError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn corrupt_metadata_becomes_empty_map() {
        let backend = Arc::new(InMemoryVectorStore::new());
        let embedder = HashingEmbedder::new(32);
        let s = KnowledgeStore::new(
            backend.clone(),
            Arc::new(embedder),
            StoreSettings::default(),
        );
        s.init().await.unwrap();
        backend
            .upsert(
                DEFAULT_KNOWLEDGE_COLLECTION,
                vec![VectorPoint {
                    id: "raw".into(),
                    vector: embedder.embed_sync("broken"),
                    payload: HashMap::from([
                        ("text".into(), serde_json::json!("broken")),
                        ("metadata".into(), serde_json::json!("{oops")),
                    ]),
                }],
            )
            .await
            .unwrap();
        let hits = s.search_knowledge("broken", 1).await.unwrap();
        assert_eq!(hits[0].content, "broken");
        assert!(hits[0].metadata.is_empty());
    }
}
