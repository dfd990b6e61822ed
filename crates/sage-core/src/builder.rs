//! Chunk documents into the knowledge store and extract FAQ pairs with the model.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sage_llm::LlmProvider;
use sage_mcp::{KnowledgeClient, McpError};
use sage_memory::Metadata;
use sage_memory::document::{DocumentError, DocumentLoader, TextLoader};
use sage_memory::splitter::{SplitterConfig, TextSplitter, chunk_text};
use serde::Serialize;

use crate::extract::{FaqPair, extract_json_array};
use crate::prompts;

pub const DEFAULT_FAQ_EXTRACTION_THRESHOLD: usize = 8000;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("failed to load document: {0}")]
    Load(#[from] DocumentError),
    #[error(transparent)]
    Client(#[from] McpError),
}

/// Outcome of one build. Per-item failures are counted, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub stored_chunks: usize,
    pub total_chunks: usize,
    pub extracted_faqs: usize,
    pub stored_faqs: usize,
    pub faqs: Vec<FaqPair>,
}

pub struct KnowledgeBuilder<P> {
    client: Arc<KnowledgeClient>,
    llm: Arc<P>,
    splitter: TextSplitter,
    loader: TextLoader,
    faq_extraction_threshold: usize,
}

impl<P> std::fmt::Debug for KnowledgeBuilder<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBuilder")
            .field("splitter", &self.splitter)
            .field("faq_extraction_threshold", &self.faq_extraction_threshold)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> KnowledgeBuilder<P> {
    #[must_use]
    pub fn new(client: Arc<KnowledgeClient>, llm: Arc<P>, splitter: SplitterConfig) -> Self {
        Self {
            client,
            llm,
            splitter: TextSplitter::new(splitter),
            loader: TextLoader::default(),
            faq_extraction_threshold: DEFAULT_FAQ_EXTRACTION_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_faq_extraction_threshold(mut self, chars: usize) -> Self {
        self.faq_extraction_threshold = chars;
        self
    }

    #[must_use]
    pub fn with_loader(mut self, loader: TextLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Store `text` as chunks and, optionally, model-extracted FAQ pairs.
    ///
    /// # Errors
    ///
    /// Fails only when the tool session cannot be established; individual store
    /// failures are logged and reflected in the report.
    pub async fn build_from_text(
        &self,
        text: &str,
        metadata: &Metadata,
        extract_faq: bool,
    ) -> Result<BuildReport, BuildError> {
        self.client.ensure_connected().await?;

        let chunks = self.splitter.split(text, metadata);
        let mut report = BuildReport {
            total_chunks: chunks.len(),
            ..BuildReport::default()
        };
        tracing::info!(chunks = chunks.len(), "split text into chunks");

        for chunk in &chunks {
            match self
                .client
                .store_knowledge(&chunk.content, &chunk.stored_metadata())
                .await
            {
                Ok(_) => report.stored_chunks += 1,
                Err(e) => tracing::error!(chunk = chunk.chunk_index, "failed to store chunk: {e:#}"),
            }
        }

        if extract_faq {
            let faqs = self.extract_faqs(text).await;
            report.extracted_faqs = faqs.len();
            tracing::info!(faqs = faqs.len(), "extracted FAQs from text");
            for faq in &faqs {
                match self
                    .client
                    .store_faq(&faq.question, &faq.answer, metadata)
                    .await
                {
                    Ok(_) => report.stored_faqs += 1,
                    Err(e) => tracing::error!(question = %faq.question, "failed to store FAQ: {e:#}"),
                }
            }
            report.faqs = faqs;
        }

        tracing::info!(
            stored_chunks = report.stored_chunks,
            total_chunks = report.total_chunks,
            stored_faqs = report.stored_faqs,
            "build complete"
        );
        Ok(report)
    }

    /// Load a UTF-8 file and build from its content.
    ///
    /// File facts (`file_name`, `file_path`, `file_size`, `content_type`) are
    /// merged over the caller's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::FileNotFound`] before touching the session when the
    /// path does not exist, [`BuildError::Load`] when it cannot be read, and
    /// otherwise the errors of [`build_from_text`](Self::build_from_text).
    pub async fn build_from_file(
        &self,
        path: &Path,
        metadata: &Metadata,
        extract_faq: bool,
    ) -> Result<BuildReport, BuildError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(BuildError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let document = self.loader.load(path).await?;

        let mut merged = metadata.clone();
        merged.extend(document.metadata.to_metadata());
        tracing::info!(
            file = %document.metadata.file_name,
            bytes = document.metadata.file_size,
            "building from file"
        );
        self.build_from_text(&document.content, &merged, extract_faq)
            .await
    }

    /// Ask the model for FAQ pairs. Long text is chunked and extracted piecewise.
    ///
    /// Never fails: model or parse errors yield no pairs for that piece.
    pub async fn extract_faqs(&self, text: &str) -> Vec<FaqPair> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.faq_extraction_threshold {
            return self.extract_piece(text).await;
        }

        let config = self.splitter.config();
        let mut faqs = Vec::new();
        for piece in chunk_text(text, config.chunk_size, config.chunk_overlap) {
            faqs.extend(self.extract_piece(&piece).await);
        }
        faqs
    }

    async fn extract_piece(&self, text: &str) -> Vec<FaqPair> {
        let reply = match self
            .llm
            .complete(prompts::FAQ_EXTRACTION_SYSTEM, &prompts::faq_extraction_user(text))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(provider = self.llm.name(), "FAQ extraction failed: {e:#}");
                return Vec::new();
            }
        };

        match extract_json_array::<FaqPair>(&reply) {
            Ok(pairs) => {
                let total = pairs.len();
                let complete: Vec<FaqPair> = pairs.into_iter().filter(FaqPair::is_complete).collect();
                if complete.len() < total {
                    tracing::warn!(
                        dropped = total - complete.len(),
                        "dropped FAQ pairs with an empty question or answer"
                    );
                }
                complete
            }
            Err(e) => {
                tracing::error!("could not parse FAQ extraction reply: {e}");
                Vec::new()
            }
        }
    }
}
