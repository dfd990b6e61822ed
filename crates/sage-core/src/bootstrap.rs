//! Application bootstrap: config resolution and construction of the store,
//! providers, and tool session from one [`Config`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sage_llm::{EmbeddingProvider, HashingEmbedder, OpenAiProvider};
use sage_mcp::{
    Backoff, ClientOptions, KnowledgeClient, KnowledgeServer, McpTransport, SessionConnector,
};
use sage_memory::splitter::SplitterConfig;
use sage_memory::{InMemoryVectorStore, KnowledgeStore, QdrantOps, StoreSettings, VectorStore};

use crate::builder::KnowledgeBuilder;
use crate::config::{Config, EmbeddingProviderKind, StoreBackend, TransportKind};
use crate::retriever::{KnowledgeRetriever, RetrieverSettings};
use crate::vault::{EnvVaultProvider, VaultProvider};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const KNOWLEDGE_SERVER_ID: &str = "knowledge";

/// Priority: explicit path > `SAGE_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("SAGE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Load, validate, and resolve secrets from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed or fails validation.
    pub async fn from_env(cli_config: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = resolve_config_path(cli_config);
        let mut config = Config::load(&config_path)?;
        config.validate()?;
        config.resolve_secrets(&EnvVaultProvider).await?;
        Ok(Self {
            config,
            config_path,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the config fails validation or the vault fails.
    pub async fn from_config(mut config: Config, vault: &dyn VaultProvider) -> anyhow::Result<Self> {
        config.validate()?;
        config.resolve_secrets(vault).await?;
        Ok(Self {
            config,
            config_path: PathBuf::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn api_key(&self) -> String {
        self.config
            .secrets
            .llm_api_key
            .as_ref()
            .map(|s| s.expose().to_owned())
            .unwrap_or_default()
    }

    /// Chat provider for extraction, decomposition and synthesis.
    #[must_use]
    pub fn build_llm(&self) -> OpenAiProvider {
        if self.config.secrets.llm_api_key.is_none() {
            tracing::warn!(
                "{} is not set; model calls will likely be rejected",
                crate::config::API_KEY_VAR
            );
        }
        let llm = &self.config.llm;
        OpenAiProvider::new(
            self.api_key(),
            llm.base_url.clone(),
            llm.model.clone(),
            llm.max_tokens,
        )
        .with_temperature(llm.temperature)
    }

    /// # Errors
    ///
    /// Returns an error if the OpenAI embedder is selected without an API key.
    pub fn build_embedder(&self) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        let emb = &self.config.embedding;
        match emb.provider {
            EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(emb.dimension))),
            EmbeddingProviderKind::OpenAi => {
                if self.config.secrets.llm_api_key.is_none() {
                    anyhow::bail!(
                        "embedding.provider = \"openai\" requires {}",
                        crate::config::API_KEY_VAR
                    );
                }
                let llm = &self.config.llm;
                Ok(Arc::new(
                    OpenAiProvider::new(
                        self.api_key(),
                        llm.base_url.clone(),
                        llm.model.clone(),
                        llm.max_tokens,
                    )
                    .with_embedding(emb.model.clone(), emb.dimension),
                ))
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn build_vector_store(&self) -> anyhow::Result<Arc<dyn VectorStore>> {
        let store = &self.config.store;
        match store.backend {
            StoreBackend::Memory => {
                tracing::info!("using in-memory vector store");
                Ok(Arc::new(InMemoryVectorStore::new()))
            }
            StoreBackend::Qdrant => {
                let ops = QdrantOps::new(&store.qdrant_url)
                    .map_err(|e| anyhow::anyhow!("failed to create Qdrant client: {e}"))?
                    .with_ef_search(store.index.ef_search);
                tracing::info!(url = %store.qdrant_url, "using Qdrant vector store");
                Ok(Arc::new(ops))
            }
        }
    }

    /// Build and initialize the knowledge store.
    ///
    /// # Errors
    ///
    /// Fails on backend construction errors or a collection dimension mismatch.
    pub async fn build_store(&self) -> anyhow::Result<Arc<KnowledgeStore>> {
        let store = &self.config.store;
        let settings = StoreSettings {
            knowledge_collection: store.knowledge_collection.clone(),
            faq_collection: store.faq_collection.clone(),
            index: store.index.into(),
            score_threshold: store.score_threshold,
        };
        let knowledge = KnowledgeStore::new(self.build_vector_store()?, self.build_embedder()?, settings);
        knowledge
            .init()
            .await
            .context("failed to initialize knowledge store")?;
        Ok(Arc::new(knowledge))
    }

    /// # Errors
    ///
    /// Propagates [`build_store`](Self::build_store) failures.
    pub async fn build_server(&self) -> anyhow::Result<KnowledgeServer> {
        let store = self.build_store().await?;
        Ok(KnowledgeServer::new(store, self.config.rag.max_search_results))
    }

    /// How the client reaches the tool host. An empty stdio command means this
    /// executable, so `sage build` talks to `sage serve`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current executable cannot be resolved or the URL
    /// is invalid, and refuses stdio with the memory backend: each spawned host
    /// would start empty and drop everything on exit.
    pub fn build_transport(&self) -> anyhow::Result<McpTransport> {
        let mcp = &self.config.mcp;
        let transport = match mcp.transport {
            TransportKind::Stdio => {
                if self.config.store.backend == StoreBackend::Memory {
                    anyhow::bail!(
                        "mcp.transport = \"stdio\" with store.backend = \"memory\" loses all data \
                         when the spawned host exits; use transport = \"http\" against \
                         `sage serve --http`, or store.backend = \"qdrant\""
                    );
                }
                let command = if mcp.command.is_empty() {
                    std::env::current_exe()
                        .context("failed to resolve current executable")?
                        .display()
                        .to_string()
                } else {
                    mcp.command.clone()
                };
                let mut env = std::collections::HashMap::new();
                if !self.config_path.as_os_str().is_empty() {
                    env.insert(
                        "SAGE_CONFIG".to_owned(),
                        self.config_path.display().to_string(),
                    );
                }
                McpTransport::Stdio {
                    command,
                    args: mcp.args.clone(),
                    env,
                }
            }
            TransportKind::Http => McpTransport::Http {
                url: mcp.url.clone(),
            },
        };
        transport.validate()?;
        Ok(transport)
    }

    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        let mcp = &self.config.mcp;
        ClientOptions {
            max_attempts: mcp.connect_attempts,
            retry_delay: Duration::from_millis(mcp.retry_delay_ms),
            backoff: Backoff::Linear,
            call_timeout: Duration::from_secs(mcp.timeout_secs),
            required_tools: Vec::new(),
        }
    }

    #[must_use]
    pub fn build_client(&self, connector: Arc<dyn SessionConnector>) -> KnowledgeClient {
        KnowledgeClient::new(KNOWLEDGE_SERVER_ID, connector, self.client_options())
    }

    /// Assemble the client-side context over the configured transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be configured.
    pub fn build_context(&self) -> anyhow::Result<AppContext<OpenAiProvider>> {
        let connector: Arc<dyn SessionConnector> = Arc::new(self.build_transport()?);
        Ok(self.build_context_with(connector, self.build_llm()))
    }

    /// Client-side context over an explicit connector and model.
    #[must_use]
    pub fn build_context_with<P>(&self, connector: Arc<dyn SessionConnector>, llm: P) -> AppContext<P> {
        let rag = &self.config.rag;
        AppContext {
            client: Arc::new(self.build_client(connector)),
            llm: Arc::new(llm),
            splitter: SplitterConfig {
                chunk_size: rag.chunk_size,
                chunk_overlap: rag.chunk_overlap,
            },
            retriever: RetrieverSettings {
                max_search_results: rag.max_search_results,
                max_context_items: rag.max_context_items,
                knowledge_key_chars: rag.knowledge_key_chars,
            },
            faq_extraction_threshold: rag.faq_extraction_threshold,
        }
    }
}

/// Shared handles for one client process. Built once, passed down.
pub struct AppContext<P> {
    pub client: Arc<KnowledgeClient>,
    pub llm: Arc<P>,
    pub splitter: SplitterConfig,
    pub retriever: RetrieverSettings,
    pub faq_extraction_threshold: usize,
}

impl<P: sage_llm::LlmProvider> AppContext<P> {
    #[must_use]
    pub fn builder(&self) -> KnowledgeBuilder<P> {
        KnowledgeBuilder::new(
            Arc::clone(&self.client),
            Arc::clone(&self.llm),
            self.splitter.clone(),
        )
        .with_faq_extraction_threshold(self.faq_extraction_threshold)
    }

    #[must_use]
    pub fn retriever(&self) -> KnowledgeRetriever<P> {
        KnowledgeRetriever::new(Arc::clone(&self.client), Arc::clone(&self.llm), self.retriever)
    }

    /// Close the tool session. Safe to call on every exit path.
    pub async fn shutdown(&self) {
        self.client.close().await;
    }
}
