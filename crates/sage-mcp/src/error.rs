#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("connection failed for server '{server_id}' after {attempts} attempt(s): {message}")]
    Connection {
        server_id: String,
        attempts: u32,
        message: String,
    },

    /// One transport open or handshake attempt failed.
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("invalid MCP server URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("server '{server_id}' is missing required tools: {}", missing.join(", "))]
    MissingTools {
        server_id: String,
        missing: Vec<String>,
    },

    #[error("server '{server_id}' is not connected")]
    NotConnected { server_id: String },

    #[error("session with server '{server_id}' is closed")]
    Closed { server_id: String },

    #[error("tool '{tool_name}' not found on server '{server_id}'")]
    ToolNotFound {
        server_id: String,
        tool_name: String,
    },

    #[error("tool call failed: {server_id}/{tool_name}: {message}")]
    ToolCall {
        server_id: String,
        tool_name: String,
        message: String,
    },

    /// The tool ran but reported `"status": "error"` in its payload.
    #[error("tool {tool_name} reported an error: {message}")]
    ToolFailed { tool_name: String, message: String },

    #[error("tool call timed out after {timeout_secs}s: {server_id}/{tool_name}")]
    Timeout {
        server_id: String,
        tool_name: String,
        timeout_secs: u64,
    },

    #[error("tool host failed: {message}")]
    Serve { message: String },
}
