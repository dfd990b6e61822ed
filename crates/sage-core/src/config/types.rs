use serde::{Deserialize, Serialize};

use crate::vault::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Chat model used for FAQ extraction, decomposition and synthesis.
#[derive(Debug, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local feature hashing; no network, deterministic.
    Hashing,
    OpenAi,
}

impl EmbeddingProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hashing => "hashing",
            Self::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProviderKind,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

fn default_embedding_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::Hashing
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_embedding_dimension() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Qdrant,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_knowledge_collection")]
    pub knowledge_collection: String,
    #[serde(default = "default_faq_collection")]
    pub faq_collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
    #[serde(default)]
    pub index: IndexConfig,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_knowledge_collection() -> String {
    sage_memory::knowledge::DEFAULT_KNOWLEDGE_COLLECTION.into()
}

fn default_faq_collection() -> String {
    sage_memory::knowledge::DEFAULT_FAQ_COLLECTION.into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            qdrant_url: default_qdrant_url(),
            knowledge_collection: default_knowledge_collection(),
            faq_collection: default_faq_collection(),
            score_threshold: None,
            index: IndexConfig::default(),
        }
    }
}

/// HNSW parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_hnsw_m")]
    pub m: u64,
    #[serde(default = "default_ef")]
    pub ef_construct: u64,
    #[serde(default = "default_ef")]
    pub ef_search: u64,
}

fn default_hnsw_m() -> u64 {
    8
}

fn default_ef() -> u64 {
    64
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            m: default_hnsw_m(),
            ef_construct: default_ef(),
            ef_search: default_ef(),
        }
    }
}

impl From<IndexConfig> for sage_memory::IndexParams {
    fn from(c: IndexConfig) -> Self {
        Self {
            m: c.m,
            ef_construct: c.ef_construct,
            ef_search: c.ef_search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stdio,
    Http,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct McpConfig {
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    /// Tool host executable for the stdio transport; empty means this binary.
    #[serde(default)]
    pub command: String,
    #[serde(default = "default_mcp_args")]
    pub args: Vec<String>,
    #[serde(default = "default_mcp_url")]
    pub url: String,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_transport() -> TransportKind {
    TransportKind::Http
}

fn default_mcp_args() -> Vec<String> {
    vec!["serve".into()]
}

fn default_mcp_url() -> String {
    "http://127.0.0.1:8080/mcp".into()
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            command: String::new(),
            args: default_mcp_args(),
            url: default_mcp_url(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[allow(clippy::struct_field_names)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
    #[serde(default = "default_max_context_items")]
    pub max_context_items: usize,
    /// Texts longer than this many chars are chunked before FAQ extraction.
    #[serde(default = "default_faq_extraction_threshold")]
    pub faq_extraction_threshold: usize,
    #[serde(default = "default_knowledge_key_chars")]
    pub knowledge_key_chars: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_max_search_results() -> usize {
    5
}

fn default_max_context_items() -> usize {
    6
}

fn default_faq_extraction_threshold() -> usize {
    8000
}

fn default_knowledge_key_chars() -> usize {
    100
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_search_results: default_max_search_results(),
            max_context_items: default_max_context_items(),
            faq_extraction_threshold: default_faq_extraction_threshold(),
            knowledge_key_chars: default_knowledge_key_chars(),
        }
    }
}

/// Streamable HTTP listener for `sage serve --http`.
#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_server_path")]
    pub path: String,
}

fn default_server_host() -> String {
    "127.0.0.1".into()
}

fn default_server_port() -> u16 {
    8080
}

fn default_server_path() -> String {
    "/mcp".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            path: default_server_path(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub llm_api_key: Option<Secret>,
}
