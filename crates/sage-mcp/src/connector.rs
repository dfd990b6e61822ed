//! Transport opening: one connector call performs one open + initialize handshake.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransport;
use sage_memory::KnowledgeStore;
use tokio::process::Command;
use url::Url;

use crate::error::McpError;
use crate::server::KnowledgeServer;

pub type ClientService = RunningService<rmcp::RoleClient, ()>;

pub type OpenFuture<'a> = Pin<Box<dyn Future<Output = Result<ClientService, McpError>> + Send + 'a>>;

/// Opens a fresh client session. Called once per connection attempt.
pub trait SessionConnector: Send + Sync {
    fn open(&self) -> OpenFuture<'_>;

    /// Human-readable endpoint for logs.
    fn describe(&self) -> String;
}

/// How to reach the knowledge tool host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpTransport {
    /// Spawn a child process speaking MCP over stdin/stdout.
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    /// Streamable HTTP endpoint, e.g. `http://127.0.0.1:8080/mcp`.
    Http { url: String },
}

impl McpTransport {
    /// # Errors
    ///
    /// Returns `McpError::InvalidUrl` for an unparsable or non-http(s) URL.
    pub fn validate(&self) -> Result<(), McpError> {
        let Self::Http { url } = self else {
            return Ok(());
        };
        let parsed = Url::parse(url).map_err(|e| McpError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(McpError::InvalidUrl {
                url: url.clone(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if parsed.host_str().is_none() {
            return Err(McpError::InvalidUrl {
                url: url.clone(),
                message: "missing host".into(),
            });
        }
        Ok(())
    }
}

impl SessionConnector for McpTransport {
    fn open(&self) -> OpenFuture<'_> {
        Box::pin(async move {
            self.validate()?;
            match self {
                Self::Stdio { command, args, env } => {
                    let mut cmd = Command::new(command);
                    cmd.args(args);
                    for (k, v) in env {
                        cmd.env(k, v);
                    }
                    let transport = TokioChildProcess::new(cmd).map_err(|e| McpError::Transport {
                        message: format!("failed to spawn '{command}': {e}"),
                    })?;
                    ().serve(transport).await.map_err(|e| McpError::Transport {
                        message: e.to_string(),
                    })
                }
                Self::Http { url } => {
                    let transport = StreamableHttpClientTransport::from_uri(url.clone());
                    ().serve(transport).await.map_err(|e| McpError::Transport {
                        message: e.to_string(),
                    })
                }
            }
        })
    }

    fn describe(&self) -> String {
        match self {
            Self::Stdio { command, args, .. } => {
                if args.is_empty() {
                    format!("stdio:{command}")
                } else {
                    format!("stdio:{command} {}", args.join(" "))
                }
            }
            Self::Http { url } => url.clone(),
        }
    }
}

/// Runs a [`KnowledgeServer`] in-process over an in-memory duplex pipe.
///
/// Each `open` spawns a fresh server task bound to the same store.
#[derive(Debug, Clone)]
pub struct InProcessConnector {
    store: Arc<KnowledgeStore>,
    default_size: usize,
}

impl InProcessConnector {
    #[must_use]
    pub fn new(store: Arc<KnowledgeStore>, default_size: usize) -> Self {
        Self {
            store,
            default_size,
        }
    }
}

impl SessionConnector for InProcessConnector {
    fn open(&self) -> OpenFuture<'_> {
        Box::pin(async move {
            let (client_io, server_io) = tokio::io::duplex(64 * 1024);
            let server = KnowledgeServer::new(Arc::clone(&self.store), self.default_size);
            tokio::spawn(async move {
                match server.serve(server_io).await {
                    Ok(running) => {
                        if let Err(e) = running.waiting().await {
                            tracing::warn!("in-process tool host task failed: {e}");
                        }
                    }
                    Err(e) => tracing::warn!("in-process tool host failed to start: {e}"),
                }
            });
            ().serve(client_io).await.map_err(|e| McpError::Transport {
                message: e.to_string(),
            })
        })
    }

    fn describe(&self) -> String {
        "in-process".into()
    }
}
