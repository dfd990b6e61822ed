//! Question answering over the knowledge and FAQ stores.

use std::sync::Arc;

use sage_llm::LlmProvider;
use sage_mcp::{KnowledgeClient, McpError};

use crate::context::{ContextItem, assemble_context, filter_context};
use crate::extract::extract_json_array;
use crate::prompts::{self, GENERATION_FAILED_ANSWER, NO_CONTEXT_ANSWER};

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Client(#[from] McpError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieverSettings {
    pub max_search_results: usize,
    pub max_context_items: usize,
    pub knowledge_key_chars: usize,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            max_search_results: 5,
            max_context_items: 6,
            knowledge_key_chars: 100,
        }
    }
}

pub struct KnowledgeRetriever<P> {
    client: Arc<KnowledgeClient>,
    llm: Arc<P>,
    settings: RetrieverSettings,
}

impl<P> std::fmt::Debug for KnowledgeRetriever<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeRetriever")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> KnowledgeRetriever<P> {
    #[must_use]
    pub fn new(client: Arc<KnowledgeClient>, llm: Arc<P>, settings: RetrieverSettings) -> Self {
        Self {
            client,
            llm,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &RetrieverSettings {
        &self.settings
    }

    /// Answer `question` from stored context.
    ///
    /// Returns a fixed apology when nothing relevant is found and a fixed error
    /// sentence when the model fails to synthesize.
    ///
    /// # Errors
    ///
    /// Fails only when the tool session cannot be established.
    pub async fn query(&self, question: &str) -> Result<String, RetrieveError> {
        let context = self.search(question).await?;
        let rendered = assemble_context(&context);
        if rendered.is_empty() {
            tracing::info!("no context found for question");
            return Ok(NO_CONTEXT_ANSWER.to_owned());
        }

        match self
            .llm
            .complete(prompts::ANSWER_SYSTEM, &prompts::answer_user(&rendered, question))
            .await
        {
            Ok(answer) => Ok(answer),
            Err(e) => {
                tracing::error!(provider = self.llm.name(), "answer generation failed: {e:#}");
                Ok(GENERATION_FAILED_ANSWER.to_owned())
            }
        }
    }

    /// Decompose, search both stores per sub-question, then dedup and cap.
    ///
    /// # Errors
    ///
    /// Fails only when the tool session cannot be established; individual search
    /// failures are logged and skipped.
    pub async fn search(&self, question: &str) -> Result<Vec<ContextItem>, RetrieveError> {
        self.client.ensure_connected().await?;

        let sub_questions = self.decompose(question).await;
        tracing::info!(count = sub_questions.len(), "decomposed question");

        let size = self.settings.max_search_results;
        let mut gathered = Vec::new();
        for sub in &sub_questions {
            match self.client.search_knowledge(sub, size).await {
                Ok(hits) => gathered.extend(hits.into_iter().map(ContextItem::Knowledge)),
                Err(e) => tracing::error!(sub_question = %sub, "knowledge search failed: {e:#}"),
            }
            match self.client.search_faq(sub, size).await {
                Ok(hits) => gathered.extend(hits.into_iter().map(ContextItem::Faq)),
                Err(e) => tracing::error!(sub_question = %sub, "FAQ search failed: {e:#}"),
            }
        }

        let total = gathered.len();
        let filtered = filter_context(
            gathered,
            self.settings.max_context_items,
            self.settings.knowledge_key_chars,
        );
        tracing::info!(gathered = total, kept = filtered.len(), "filtered context");
        Ok(filtered)
    }

    /// Split a question into sub-questions; any failure falls back to `[question]`.
    pub async fn decompose(&self, question: &str) -> Vec<String> {
        let fallback = || vec![question.to_owned()];

        let reply = match self
            .llm
            .complete(prompts::DECOMPOSE_SYSTEM, &prompts::decompose_user(question))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("question decomposition failed: {e:#}");
                return fallback();
            }
        };

        match extract_json_array::<String>(&reply) {
            Ok(subs) => {
                let subs: Vec<String> = subs
                    .into_iter()
                    .map(|s| s.trim().to_owned())
                    .filter(|s| !s.is_empty())
                    .collect();
                if subs.is_empty() { fallback() } else { subs }
            }
            Err(e) => {
                tracing::warn!("could not parse decomposition reply, using original question: {e}");
                fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use sage_llm::HashingEmbedder;
    use sage_llm::mock::MockProvider;
    use sage_mcp::{Backoff, ClientOptions, InProcessConnector};
    use sage_memory::{InMemoryVectorStore, KnowledgeStore, Metadata, StoreSettings};

    use super::*;

    async fn fixture(llm: MockProvider) -> (KnowledgeRetriever<MockProvider>, Arc<KnowledgeStore>) {
        let store = KnowledgeStore::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(HashingEmbedder::new(64)),
            StoreSettings::default(),
        );
        store.init().await.unwrap();
        let store = Arc::new(store);
        let client = KnowledgeClient::new(
            "knowledge",
            Arc::new(InProcessConnector::new(Arc::clone(&store), 5)),
            ClientOptions {
                max_attempts: 1,
                backoff: Backoff::Fixed,
                ..ClientOptions::default()
            },
        );
        let retriever =
            KnowledgeRetriever::new(Arc::new(client), Arc::new(llm), RetrieverSettings::default());
        (retriever, store)
    }

    #[tokio::test]
    async fn decompose_parses_array() {
        let llm = MockProvider::with_responses(vec![r#"["What is X?", " ", "Why Y?"]"#.into()]);
        let (retriever, _) = fixture(llm).await;
        assert_eq!(
            retriever.decompose("What is X and why Y?").await,
            vec!["What is X?", "Why Y?"]
        );
    }

    #[tokio::test]
    async fn decompose_falls_back_on_garbage_or_empty() {
        let llm = MockProvider::with_responses(vec!["no idea".into(), "[]".into()]);
        let (retriever, _) = fixture(llm).await;
        assert_eq!(retriever.decompose("q1").await, vec!["q1"]);
        assert_eq!(retriever.decompose("q2").await, vec!["q2"]);
    }

    #[tokio::test]
    async fn decompose_falls_back_on_model_error() {
        let (retriever, _) = fixture(MockProvider::failing()).await;
        assert_eq!(retriever.decompose("q").await, vec!["q"]);
    }

    #[tokio::test]
    async fn empty_store_returns_apology_without_synthesis() {
        let llm = MockProvider::default().with_default("[\"anything\"]");
        let (retriever, _) = fixture(llm.clone()).await;
        let answer = retriever.query("What is the capital of France?").await.unwrap();
        assert_eq!(answer, NO_CONTEXT_ANSWER);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn search_puts_faq_first_and_dedups_across_sub_questions() {
        let llm = MockProvider::with_responses(vec![r#"["capital of France", "Paris"]"#.into()]);
        let (retriever, store) = fixture(llm).await;
        store
            .store_knowledge("Paris is the capital of France.", &Metadata::new())
            .await
            .unwrap();
        store
            .store_faq("What is the capital of France?", "Paris", &Metadata::new())
            .await
            .unwrap();

        let items = retriever.search("Tell me about Paris").await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_faq());
        assert!(!items[1].is_faq());
    }

    #[tokio::test]
    async fn synthesis_failure_returns_fixed_sentence() {
        let llm = MockProvider::failing();
        let (retriever, store) = fixture(llm).await;
        store
            .store_knowledge("Paris is the capital of France.", &Metadata::new())
            .await
            .unwrap();
        let answer = retriever.query("capital?").await.unwrap();
        assert_eq!(answer, GENERATION_FAILED_ANSWER);
    }

    #[tokio::test]
    async fn synthesis_prompt_contains_context() {
        let llm = MockProvider::with_responses(vec!["[\"capital\"]".into(), "Paris.".into()]);
        let (retriever, store) = fixture(llm.clone()).await;
        store
            .store_knowledge("Paris is the capital of France.", &Metadata::new())
            .await
            .unwrap();
        let answer = retriever.query("What is the capital of France?").await.unwrap();
        assert_eq!(answer, "Paris.");
        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1][1].content.contains("Paris is the capital of France."));
        assert!(calls[1][1].content.ends_with("Question: What is the capital of France?"));
    }

    #[tokio::test]
    async fn closed_session_is_fatal() {
        let (retriever, _) = fixture(MockProvider::default()).await;
        retriever.client.close().await;
        assert!(matches!(
            retriever.query("anything").await,
            Err(RetrieveError::Client(McpError::Closed { .. }))
        ));
    }
}
