//! MCP session lifecycle with bounded connect retry, the typed knowledge
//! client, and the knowledge tool host.

pub mod client;
pub mod connector;
pub mod error;
pub mod knowledge;
pub mod payload;
pub mod retry;
pub mod server;
pub mod tool;

pub use client::{ClientOptions, McpClient, SessionState};
pub use connector::{ClientService, InProcessConnector, McpTransport, SessionConnector};
pub use error::McpError;
pub use knowledge::{KnowledgeClient, REQUIRED_TOOLS};
pub use payload::{ToolPayload, ToolStatus};
pub use retry::{Backoff, RetryError, RetryPolicy, retry, retry_if};
pub use server::{KnowledgeServer, serve_http, serve_stdio};
pub use tool::McpTool;
