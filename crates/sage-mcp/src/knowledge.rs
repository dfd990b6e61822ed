//! Typed client for the knowledge tool host.

use std::sync::Arc;

use sage_memory::{FaqHit, KnowledgeHit, Metadata};
use serde_json::json;

use crate::client::{ClientOptions, McpClient, SessionState};
use crate::connector::SessionConnector;
use crate::error::McpError;
use crate::payload::ToolPayload;

pub const STORE_KNOWLEDGE: &str = "storeKnowledge";
pub const SEARCH_KNOWLEDGE: &str = "searchKnowledge";
pub const STORE_FAQ: &str = "storeFAQ";
pub const SEARCH_FAQ: &str = "searchFAQ";

pub const REQUIRED_TOOLS: [&str; 4] = [STORE_KNOWLEDGE, SEARCH_KNOWLEDGE, STORE_FAQ, SEARCH_FAQ];

/// [`McpClient`] wrapper exposing the four knowledge tools as methods.
///
/// Connecting fails with `MissingTools` unless the host advertises all of them.
#[derive(Debug)]
pub struct KnowledgeClient {
    inner: McpClient,
}

impl KnowledgeClient {
    #[must_use]
    pub fn new(
        server_id: impl Into<String>,
        connector: Arc<dyn SessionConnector>,
        mut options: ClientOptions,
    ) -> Self {
        for name in REQUIRED_TOOLS {
            if !options.required_tools.iter().any(|t| t == name) {
                options.required_tools.push(name.to_owned());
            }
        }
        Self {
            inner: McpClient::new(server_id, connector, options),
        }
    }

    #[must_use]
    pub fn session(&self) -> &McpClient {
        &self.inner
    }

    pub async fn state(&self) -> SessionState {
        self.inner.state().await
    }

    /// # Errors
    ///
    /// See [`McpClient::connect`].
    pub async fn connect(&self) -> Result<(), McpError> {
        self.inner.connect().await
    }

    /// # Errors
    ///
    /// See [`McpClient::ensure_connected`].
    pub async fn ensure_connected(&self) -> Result<(), McpError> {
        self.inner.ensure_connected().await
    }

    pub async fn close(&self) {
        self.inner.close().await;
    }

    /// Call any discovered tool and decode its payload.
    ///
    /// # Errors
    ///
    /// Propagates [`McpClient::call_tool`] failures.
    pub async fn call(&self, tool: &str, args: serde_json::Value) -> Result<ToolPayload, McpError> {
        let result = self.inner.call_tool(tool, args).await?;
        Ok(ToolPayload::from_result(&result))
    }

    /// # Errors
    ///
    /// Returns `ToolFailed` when the host reports an error status.
    pub async fn store_knowledge(
        &self,
        content: &str,
        metadata: &Metadata,
    ) -> Result<String, McpError> {
        let payload = self
            .call(
                STORE_KNOWLEDGE,
                json!({"content": content, "metadata": metadata}),
            )
            .await?;
        stored_id(STORE_KNOWLEDGE, &payload)
    }

    /// # Errors
    ///
    /// Returns `ToolFailed` when the host reports an error status.
    pub async fn store_faq(
        &self,
        question: &str,
        answer: &str,
        metadata: &Metadata,
    ) -> Result<String, McpError> {
        let payload = self
            .call(
                STORE_FAQ,
                json!({"question": question, "answer": answer, "metadata": metadata}),
            )
            .await?;
        stored_id(STORE_FAQ, &payload)
    }

    /// # Errors
    ///
    /// Returns `ToolFailed` when the host reports an error status. A payload
    /// that cannot be decoded yields no hits.
    pub async fn search_knowledge(
        &self,
        query: &str,
        size: usize,
    ) -> Result<Vec<KnowledgeHit>, McpError> {
        let payload = self
            .call(SEARCH_KNOWLEDGE, json!({"query": query, "size": size}))
            .await?;
        check_status(SEARCH_KNOWLEDGE, &payload)?;
        Ok(payload.results())
    }

    /// # Errors
    ///
    /// Returns `ToolFailed` when the host reports an error status.
    pub async fn search_faq(&self, query: &str, size: usize) -> Result<Vec<FaqHit>, McpError> {
        let payload = self
            .call(SEARCH_FAQ, json!({"query": query, "size": size}))
            .await?;
        check_status(SEARCH_FAQ, &payload)?;
        Ok(payload.results())
    }
}

fn check_status(tool: &str, payload: &ToolPayload) -> Result<(), McpError> {
    match payload.status() {
        Some(status) if status.is_error() => Err(McpError::ToolFailed {
            tool_name: tool.to_owned(),
            message: status.message.unwrap_or_else(|| "unknown error".into()),
        }),
        _ => Ok(()),
    }
}

fn stored_id(tool: &str, payload: &ToolPayload) -> Result<String, McpError> {
    check_status(tool, payload)?;
    match payload {
        ToolPayload::Json(_) => Ok(payload.status().and_then(|s| s.id).unwrap_or_default()),
        ToolPayload::Text(text) => {
            tracing::warn!(tool, "store reply is not JSON: {text}");
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_becomes_tool_failed() {
        let payload = ToolPayload::parse(r#"{"status":"error","message":"disk full"}"#);
        let err = stored_id(STORE_FAQ, &payload).unwrap_err();
        assert!(matches!(
            err,
            McpError::ToolFailed { ref message, .. } if message == "disk full"
        ));
    }

    #[test]
    fn success_status_yields_id() {
        let payload =
            ToolPayload::parse(r#"{"status":"success","message":"ok","id":"abc-123"}"#);
        assert_eq!(stored_id(STORE_KNOWLEDGE, &payload).unwrap(), "abc-123");
    }

    #[test]
    fn search_results_without_status_pass() {
        let payload = ToolPayload::parse(r#"[{"question":"q","answer":"a","score":0.5}]"#);
        assert!(check_status(SEARCH_FAQ, &payload).is_ok());
        assert_eq!(payload.results::<FaqHit>().len(), 1);
    }
}
