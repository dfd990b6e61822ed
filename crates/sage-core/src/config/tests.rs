use std::io::Write;

use serial_test::serial;

use super::*;
use crate::vault::MockVaultProvider;

const ENV_KEYS: [&str; 26] = [
    "SAGE_LLM_BASE_URL",
    "SAGE_LLM_MODEL",
    "SAGE_LLM_MAX_TOKENS",
    "SAGE_LLM_TEMPERATURE",
    "SAGE_LLM_API_KEY",
    "SAGE_EMBEDDING_PROVIDER",
    "SAGE_EMBEDDING_MODEL",
    "SAGE_EMBEDDING_DIMENSION",
    "SAGE_STORE_BACKEND",
    "SAGE_QDRANT_URL",
    "SAGE_KNOWLEDGE_COLLECTION",
    "SAGE_FAQ_COLLECTION",
    "SAGE_SCORE_THRESHOLD",
    "SAGE_MCP_TRANSPORT",
    "SAGE_MCP_COMMAND",
    "SAGE_MCP_URL",
    "SAGE_MCP_CONNECT_ATTEMPTS",
    "SAGE_MCP_RETRY_DELAY_MS",
    "SAGE_MCP_TIMEOUT",
    "SAGE_SERVER_HOST",
    "SAGE_SERVER_PORT",
    "SAGE_RAG_CHUNK_SIZE",
    "SAGE_RAG_CHUNK_OVERLAP",
    "SAGE_RAG_MAX_SEARCH_RESULTS",
    "SAGE_RAG_MAX_CONTEXT_ITEMS",
    "SAGE_CONFIG",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sage.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{body}").unwrap();
    (dir, path)
}

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::Hashing);
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.store.knowledge_collection, "knowledge_store");
    assert_eq!(config.store.faq_collection, "faq_store");
    assert_eq!(config.store.index.m, 8);
    assert_eq!(config.store.index.ef_construct, 64);
    assert_eq!(config.store.index.ef_search, 64);
    assert_eq!(config.mcp.transport, TransportKind::Http);
    assert_eq!(config.mcp.url, "http://127.0.0.1:8080/mcp");
    assert_eq!(config.mcp.args, vec!["serve"]);
    assert_eq!(config.mcp.connect_attempts, 5);
    assert_eq!(config.mcp.retry_delay_ms, 2000);
    assert_eq!(config.rag.chunk_size, 1000);
    assert_eq!(config.rag.chunk_overlap, 200);
    assert_eq!(config.rag.max_search_results, 5);
    assert_eq!(config.rag.max_context_items, 6);
    assert_eq!(config.rag.faq_extraction_threshold, 8000);
    assert_eq!(config.rag.knowledge_key_chars, 100);
    assert_eq!(config.server.path, "/mcp");
    assert!(config.secrets.llm_api_key.is_none());
    config.validate().unwrap();
}

#[test]
fn shipped_default_toml_parses() {
    let config: Config =
        toml::from_str(include_str!("../../../../config/default.toml")).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.mcp.command, "");
    config.validate().unwrap();
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    clear_env();
    let config = Config::load(Path::new("/nonexistent/sage.toml")).unwrap();
    assert_eq!(config.rag.chunk_size, 1000);
}

#[test]
#[serial]
fn parse_partial_toml() {
    let (_dir, path) = write_config(
        r#"
[llm]
model = "gpt-4o"

[store]
backend = "qdrant"
qdrant_url = "http://qdrant:6334"

[store.index]
m = 16

[mcp]
transport = "stdio"
url = "http://tools:9000/mcp"

[rag]
chunk_size = 500
chunk_overlap = 50
"#,
    );
    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    assert_eq!(config.store.backend, StoreBackend::Qdrant);
    assert_eq!(config.store.qdrant_url, "http://qdrant:6334");
    assert_eq!(config.store.index.m, 16);
    assert_eq!(config.store.index.ef_search, 64);
    assert_eq!(config.mcp.transport, TransportKind::Stdio);
    assert_eq!(config.mcp.url, "http://tools:9000/mcp");
    assert_eq!(config.rag.chunk_size, 500);
    assert_eq!(config.rag.max_context_items, 6);
    config.validate().unwrap();
}

#[test]
#[serial]
fn invalid_toml_is_an_error() {
    let (_dir, path) = write_config("[rag\nchunk_size = ");
    clear_env();
    assert!(Config::load(&path).is_err());
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    let mut config = Config::default();

    unsafe {
        std::env::set_var("SAGE_LLM_MODEL", "local-model");
        std::env::set_var("SAGE_EMBEDDING_PROVIDER", "openai");
        std::env::set_var("SAGE_EMBEDDING_DIMENSION", "1536");
        std::env::set_var("SAGE_MCP_CONNECT_ATTEMPTS", "2");
        std::env::set_var("SAGE_RAG_CHUNK_SIZE", "800");
        std::env::set_var("SAGE_SCORE_THRESHOLD", "0.25");
    };
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.llm.model, "local-model");
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::OpenAi);
    assert_eq!(config.embedding.dimension, 1536);
    assert_eq!(config.mcp.connect_attempts, 2);
    assert_eq!(config.rag.chunk_size, 800);
    assert_eq!(config.store.score_threshold, Some(0.25));
}

#[test]
#[serial]
fn invalid_env_values_are_ignored() {
    clear_env();
    let mut config = Config::default();

    unsafe {
        std::env::set_var("SAGE_STORE_BACKEND", "postgres");
        std::env::set_var("SAGE_MCP_CONNECT_ATTEMPTS", "many");
        std::env::set_var("SAGE_EMBEDDING_DIMENSION", "-3");
    };
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.mcp.connect_attempts, 5);
    assert_eq!(config.embedding.dimension, 384);
}

#[test]
#[serial]
fn env_overrides_apply_after_file() {
    let (_dir, path) = write_config("[llm]\nmodel = \"from-file\"\n");
    clear_env();
    unsafe { std::env::set_var("SAGE_LLM_MODEL", "from-env") };
    let config = Config::load(&path).unwrap();
    clear_env();
    assert_eq!(config.llm.model, "from-env");
}

#[test]
fn validate_rejects_overlap_not_below_chunk_size() {
    let mut config = Config::default();
    config.rag.chunk_overlap = config.rag.chunk_size;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("chunk_overlap"));
}

#[test]
fn validate_rejects_zero_values() {
    let mut config = Config::default();
    config.embedding.dimension = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.mcp.connect_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_same_collection_names() {
    let mut config = Config::default();
    config.store.faq_collection = config.store.knowledge_collection.clone();
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_relative_server_path() {
    let mut config = Config::default();
    config.server.path = "mcp".into();
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn resolve_secrets_reads_api_key() {
    let vault = MockVaultProvider::default().with_secret(API_KEY_VAR, "sk-123");
    let mut config = Config::default();
    config.resolve_secrets(&vault).await.unwrap();
    assert_eq!(
        config.secrets.llm_api_key.as_ref().map(crate::vault::Secret::expose),
        Some("sk-123")
    );
}

#[test]
fn secrets_are_never_serialized() {
    let mut config = Config::default();
    config.secrets.llm_api_key = Some(crate::vault::Secret::new("sk-hidden"));
    let rendered = toml::to_string(&config).unwrap();
    assert!(!rendered.contains("sk-hidden"));
    assert!(rendered.contains("[rag]"));
}
