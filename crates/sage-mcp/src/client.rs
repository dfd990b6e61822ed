use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use rmcp::model::{CallToolRequestParams, CallToolResult};
use tokio::sync::{Mutex, watch};

use crate::connector::{ClientService, SessionConnector};
use crate::error::McpError;
use crate::payload::result_text;
use crate::retry::{Backoff, RetryError, RetryPolicy, retry_if};
use crate::tool::McpTool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub backoff: Backoff,
    pub call_timeout: Duration,
    /// Tools that must be advertised for a connection to count as established.
    pub required_tools: Vec<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(2),
            backoff: Backoff::Linear,
            call_timeout: Duration::from_secs(30),
            required_tools: Vec::new(),
        }
    }
}

impl ClientOptions {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: self.retry_delay,
            backoff: self.backoff,
        }
    }
}

struct Session {
    state: SessionState,
    service: Option<ClientService>,
    tools: Vec<McpTool>,
}

/// A single MCP session with connect retry, tool discovery and graceful close.
///
/// Calls are serialized through the session lock; use separate clients for
/// concurrent traffic.
pub struct McpClient {
    server_id: String,
    connector: Arc<dyn SessionConnector>,
    options: ClientOptions,
    session: Mutex<Session>,
    /// Bumped by `close()` before it waits for the session lock.
    close_signal: watch::Sender<u64>,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("server_id", &self.server_id)
            .field("endpoint", &self.connector.describe())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl McpClient {
    #[must_use]
    pub fn new(
        server_id: impl Into<String>,
        connector: Arc<dyn SessionConnector>,
        options: ClientOptions,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            connector,
            options,
            session: Mutex::new(Session {
                state: SessionState::Disconnected,
                service: None,
                tools: Vec::new(),
            }),
            close_signal: watch::Sender::new(0),
        }
    }

    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }

    /// Tools discovered by the current session.
    pub async fn list_tools(&self) -> Vec<McpTool> {
        self.session.lock().await.tools.clone()
    }

    /// Open the session, retrying transport failures with backoff.
    ///
    /// A no-op when already connected. Calling this after [`close`](Self::close)
    /// reopens the session.
    ///
    /// # Errors
    ///
    /// Returns `McpError::Connection` once every attempt has failed, or
    /// `McpError::MissingTools` when the server lacks a required tool.
    pub async fn connect(&self) -> Result<(), McpError> {
        let closing = self.close_signal.subscribe();
        let mut session = self.session.lock().await;
        self.connect_locked(&mut session, closing).await
    }

    /// Connect if the session has never been opened.
    ///
    /// # Errors
    ///
    /// Returns `McpError::Closed` after an explicit close, otherwise the errors of
    /// [`connect`](Self::connect).
    pub async fn ensure_connected(&self) -> Result<(), McpError> {
        let closing = self.close_signal.subscribe();
        let mut session = self.session.lock().await;
        match session.state {
            SessionState::Connected => Ok(()),
            SessionState::Closing | SessionState::Closed => Err(McpError::Closed {
                server_id: self.server_id.clone(),
            }),
            SessionState::Disconnected | SessionState::Connecting => {
                self.connect_locked(&mut session, closing).await
            }
        }
    }

    /// Runs the retry loop under the session lock; a `close()` issued after
    /// `closing` was subscribed aborts it and leaves the session `Closing`.
    async fn connect_locked(
        &self,
        session: &mut Session,
        mut closing: watch::Receiver<u64>,
    ) -> Result<(), McpError> {
        if session.state == SessionState::Connected {
            return Ok(());
        }
        session.state = SessionState::Connecting;
        tracing::info!(
            server_id = self.server_id,
            endpoint = %self.connector.describe(),
            "connecting to MCP server"
        );

        let policy = self.options.retry_policy();
        let attempts = retry_if(
            &policy,
            &self.server_id,
            |_attempt| self.open_and_discover(),
            |e| matches!(e, McpError::Transport { .. } | McpError::Timeout { .. }),
        );
        let outcome = tokio::select! {
            outcome = attempts => outcome,
            _ = closing.changed() => {
                tracing::info!(server_id = self.server_id, "connect interrupted by close");
                session.state = SessionState::Closing;
                return Err(McpError::Closed {
                    server_id: self.server_id.clone(),
                });
            }
        };

        match outcome {
            Ok((service, tools)) => {
                tracing::info!(
                    server_id = self.server_id,
                    tools = tools.len(),
                    "connected to MCP server"
                );
                session.service = Some(service);
                session.tools = tools;
                session.state = SessionState::Connected;
                Ok(())
            }
            Err(err) => {
                session.state = SessionState::Disconnected;
                Err(match err {
                    RetryError::Exhausted { attempts, last } => McpError::Connection {
                        server_id: self.server_id.clone(),
                        attempts,
                        message: last.to_string(),
                    },
                    RetryError::Aborted { error, .. } => error,
                })
            }
        }
    }

    async fn open_and_discover(&self) -> Result<(ClientService, Vec<McpTool>), McpError> {
        let service = self.connector.open().await?;

        let listed = tokio::time::timeout(self.options.call_timeout, service.list_all_tools())
            .await
            .map_err(|_| McpError::Timeout {
                server_id: self.server_id.clone(),
                tool_name: "tools/list".into(),
                timeout_secs: self.options.call_timeout.as_secs(),
            })?
            .map_err(|e| McpError::Transport {
                message: format!("tools/list failed: {e}"),
            });
        let listed = match listed {
            Ok(listed) => listed,
            Err(e) => {
                self.discard(service).await;
                return Err(e);
            }
        };

        let tools: Vec<McpTool> = listed
            .into_iter()
            .map(|t| McpTool::from_rmcp(&self.server_id, t))
            .collect();

        let missing: Vec<String> = self
            .options
            .required_tools
            .iter()
            .filter(|name| !tools.iter().any(|t| &t.name == *name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            self.discard(service).await;
            return Err(McpError::MissingTools {
                server_id: self.server_id.clone(),
                missing,
            });
        }

        Ok((service, tools))
    }

    async fn discard(&self, service: ClientService) {
        if let Err(e) = service.cancel().await {
            tracing::debug!(
                server_id = self.server_id,
                "rejected session did not shut down cleanly: {e}"
            );
        }
    }

    /// Invoke a discovered tool with JSON object arguments.
    ///
    /// # Errors
    ///
    /// Returns `McpError::NotConnected`/`Closed` outside a live session,
    /// `ToolNotFound` for an undiscovered name, `Timeout` when the call exceeds the
    /// configured limit, and `ToolCall` for transport failures or error results.
    pub async fn call_tool(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        let session = self.session.lock().await;
        let service = match (session.state, session.service.as_ref()) {
            (SessionState::Connected, Some(service)) => service,
            (SessionState::Closing | SessionState::Closed, _) => {
                return Err(McpError::Closed {
                    server_id: self.server_id.clone(),
                });
            }
            _ => {
                return Err(McpError::NotConnected {
                    server_id: self.server_id.clone(),
                });
            }
        };

        if !session.tools.iter().any(|t| t.name == name) {
            return Err(McpError::ToolNotFound {
                server_id: self.server_id.clone(),
                tool_name: name.into(),
            });
        }

        let arguments = match args {
            serde_json::Value::Object(map) => Some(map),
            serde_json::Value::Null => None,
            other => {
                return Err(McpError::ToolCall {
                    server_id: self.server_id.clone(),
                    tool_name: name.into(),
                    message: format!("arguments must be a JSON object, got {other}"),
                });
            }
        };

        let params = CallToolRequestParams {
            name: Cow::Owned(name.to_owned()),
            arguments,
            task: None,
            meta: None,
        };

        tracing::debug!(server_id = self.server_id, tool = name, "calling MCP tool");
        let result = tokio::time::timeout(self.options.call_timeout, service.call_tool(params))
            .await
            .map_err(|_| McpError::Timeout {
                server_id: self.server_id.clone(),
                tool_name: name.into(),
                timeout_secs: self.options.call_timeout.as_secs(),
            })?
            .map_err(|e| McpError::ToolCall {
                server_id: self.server_id.clone(),
                tool_name: name.into(),
                message: e.to_string(),
            })?;

        if result.is_error == Some(true) {
            return Err(McpError::ToolCall {
                server_id: self.server_id.clone(),
                tool_name: name.into(),
                message: result_text(&result),
            });
        }
        Ok(result)
    }

    /// Tear the session down. Idempotent and safe on a never-connected client.
    ///
    /// Interrupts a connect that is still retrying.
    pub async fn close(&self) {
        self.close_signal
            .send_modify(|generation| *generation = generation.wrapping_add(1));
        let mut session = self.session.lock().await;
        if session.state == SessionState::Closed {
            tracing::debug!(server_id = self.server_id, "MCP session already closed");
            return;
        }
        session.state = SessionState::Closing;
        session.tools.clear();
        if let Some(service) = session.service.take() {
            match service.cancel().await {
                Ok(reason) => {
                    tracing::debug!(server_id = self.server_id, ?reason, "MCP session closed");
                }
                Err(e) => {
                    tracing::warn!(
                        server_id = self.server_id,
                        "MCP session task ended abnormally during close: {e}"
                    );
                }
            }
        }
        session.state = SessionState::Closed;
    }
}
