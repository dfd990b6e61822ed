//! The knowledge tool host: four MCP tools backed by a [`KnowledgeStore`].

use std::future::Future;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ErrorData, ServerHandler, ServiceExt, tool, tool_handler, tool_router};
use sage_memory::{KnowledgeStore, Metadata};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::McpError;

pub const DEFAULT_SEARCH_SIZE: usize = 5;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StoreKnowledgeParams {
    /// Text to embed and store.
    pub content: String,
    /// Optional metadata stored alongside the text.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StoreFaqParams {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    /// Natural-language search query.
    pub query: String,
    /// Maximum number of results.
    #[serde(default)]
    pub size: Option<usize>,
}

#[derive(Clone)]
pub struct KnowledgeServer {
    store: Arc<KnowledgeStore>,
    default_size: usize,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for KnowledgeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeServer")
            .field("store", &self.store)
            .field("default_size", &self.default_size)
            .finish_non_exhaustive()
    }
}

fn reply(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(value.to_string())])
}

fn error_reply(message: impl std::fmt::Display) -> CallToolResult {
    reply(&json!({"status": "error", "message": message.to_string()}))
}

#[tool_router]
impl KnowledgeServer {
    #[must_use]
    pub fn new(store: Arc<KnowledgeStore>, default_size: usize) -> Self {
        Self {
            store,
            default_size: if default_size == 0 {
                DEFAULT_SEARCH_SIZE
            } else {
                default_size
            },
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "storeKnowledge",
        description = "Store a piece of knowledge text in the knowledge vector store"
    )]
    async fn store_knowledge(
        &self,
        Parameters(params): Parameters<StoreKnowledgeParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let metadata = params.metadata.unwrap_or_default();
        match self.store.store_knowledge(&params.content, &metadata).await {
            Ok(id) => Ok(reply(&json!({
                "status": "success",
                "message": "knowledge stored",
                "id": id,
            }))),
            Err(e) => {
                tracing::error!(tool = "storeKnowledge", "store failed: {e:#}");
                Ok(error_reply(e))
            }
        }
    }

    #[tool(
        name = "searchKnowledge",
        description = "Search the knowledge store for text relevant to a query"
    )]
    async fn search_knowledge(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let size = params.size.unwrap_or(self.default_size);
        match self.store.search_knowledge(&params.query, size).await {
            Ok(results) => Ok(reply(&json!({"status": "success", "results": results}))),
            Err(e) => {
                tracing::error!(tool = "searchKnowledge", "search failed: {e:#}");
                Ok(error_reply(e))
            }
        }
    }

    #[tool(
        name = "storeFAQ",
        description = "Store a question and answer pair in the FAQ vector store"
    )]
    async fn store_faq(
        &self,
        Parameters(params): Parameters<StoreFaqParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let metadata = params.metadata.unwrap_or_default();
        match self
            .store
            .store_faq(&params.question, &params.answer, &metadata)
            .await
        {
            Ok(id) => Ok(reply(&json!({
                "status": "success",
                "message": "faq stored",
                "id": id,
            }))),
            Err(e) => {
                tracing::error!(tool = "storeFAQ", "store failed: {e:#}");
                Ok(error_reply(e))
            }
        }
    }

    #[tool(
        name = "searchFAQ",
        description = "Search stored FAQ entries by question similarity"
    )]
    async fn search_faq(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let size = params.size.unwrap_or(self.default_size);
        match self.store.search_faq(&params.query, size).await {
            Ok(results) => Ok(reply(&json!({"status": "success", "results": results}))),
            Err(e) => {
                tracing::error!(tool = "searchFAQ", "search failed: {e:#}");
                Ok(error_reply(e))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for KnowledgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Knowledge and FAQ vector stores. Use storeKnowledge/storeFAQ to add \
                 entries and searchKnowledge/searchFAQ to retrieve them."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

/// Serve over this process's stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns `McpError::Serve` if the handshake or the service task fails.
pub async fn serve_stdio(server: KnowledgeServer) -> Result<(), McpError> {
    tracing::info!("serving knowledge tools over stdio");
    let running = server
        .serve(rmcp::transport::io::stdio())
        .await
        .map_err(|e| McpError::Serve {
            message: e.to_string(),
        })?;
    let reason = running.waiting().await.map_err(|e| McpError::Serve {
        message: e.to_string(),
    })?;
    tracing::info!(?reason, "stdio session ended");
    Ok(())
}

/// Serve streamable HTTP at `path` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns `McpError::Serve` if the HTTP server fails.
pub async fn serve_http<F>(
    server: KnowledgeServer,
    listener: TcpListener,
    path: &str,
    shutdown: F,
) -> Result<(), McpError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let router = axum::Router::new().nest_service(path, service);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, path, "serving knowledge tools over streamable HTTP");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| McpError::Serve {
            message: e.to_string(),
        })
}
