use serde::{Deserialize, Serialize};

/// A tool advertised by a server during discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub server_id: String,
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl McpTool {
    #[must_use]
    pub fn from_rmcp(server_id: &str, tool: rmcp::model::Tool) -> Self {
        Self {
            server_id: server_id.to_owned(),
            name: tool.name.into_owned(),
            description: tool.description.map(|d| d.into_owned()).unwrap_or_default(),
            input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
        }
    }

    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.server_id, self.name)
    }
}
