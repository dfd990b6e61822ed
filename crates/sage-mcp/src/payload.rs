//! Decoding of tool results into JSON or plain text.

use rmcp::model::{CallToolResult, RawContent};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// A tool result's payload, decided once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload {
    Json(serde_json::Value),
    Text(String),
}

/// The `{status, message, id}` envelope returned by store tools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolStatus {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error")
    }
}

impl ToolPayload {
    #[must_use]
    pub fn from_result(result: &CallToolResult) -> Self {
        if let Some(value) = &result.structured_content {
            return Self::Json(value.clone());
        }
        Self::parse(&result_text(result))
    }

    /// One parse attempt: valid JSON becomes `Json`, anything else `Text`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text.to_owned()),
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    /// Decode a `{"results": [...]}` object or a bare array into `T`s.
    ///
    /// Any other shape, or a decode failure, is logged and yields an empty list.
    #[must_use]
    pub fn results<T: DeserializeOwned>(&self) -> Vec<T> {
        let items = match self {
            Self::Json(serde_json::Value::Array(items)) => items,
            Self::Json(serde_json::Value::Object(map)) => match map.get("results") {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    tracing::warn!("tool payload has no results array");
                    return Vec::new();
                }
            },
            Self::Json(_) => {
                tracing::warn!("tool payload is neither an object nor an array");
                return Vec::new();
            }
            Self::Text(text) => {
                tracing::warn!(
                    preview = %text.chars().take(80).collect::<String>(),
                    "tool payload is not JSON"
                );
                return Vec::new();
            }
        };
        match serde_json::from_value(serde_json::Value::Array(items.clone())) {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("failed to decode tool results: {e}");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<ToolStatus> {
        self.as_json()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Concatenated text parts of a tool result.
#[must_use]
pub fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rmcp::model::Content;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
    }

    #[test]
    fn text_json_is_parsed() {
        let result = CallToolResult::success(vec![Content::text(
            r#"{"status":"success","results":[{"name":"a"}]}"#,
        )]);
        let payload = ToolPayload::from_result(&result);
        assert_eq!(
            payload.results::<Item>(),
            vec![Item { name: "a".into() }]
        );
        assert_eq!(payload.status().unwrap().status, "success");
    }

    #[test]
    fn split_text_parts_are_concatenated() {
        let result = CallToolResult::success(vec![
            Content::text(r#"[{"name":"#),
            Content::text(r#""b"}]"#),
        ]);
        let payload = ToolPayload::from_result(&result);
        assert_eq!(payload.results::<Item>().len(), 1);
    }

    #[test]
    fn structured_content_wins() {
        let mut result = CallToolResult::success(vec![Content::text("ignored")]);
        result.structured_content = Some(serde_json::json!([{"name": "s"}]));
        let payload = ToolPayload::from_result(&result);
        assert_eq!(payload.results::<Item>()[0].name, "s");
    }

    #[test]
    fn plain_text_yields_no_results() {
        let payload = ToolPayload::parse("the server said hello");
        assert!(matches!(payload, ToolPayload::Text(_)));
        assert!(payload.results::<Item>().is_empty());
        assert!(payload.status().is_none());
    }

    #[test]
    fn wrong_shape_yields_no_results() {
        assert!(ToolPayload::parse(r#"{"results": 3}"#).results::<Item>().is_empty());
        assert!(ToolPayload::parse(r#"[{"other": 1}]"#).results::<Item>().is_empty());
        assert!(ToolPayload::parse("42").results::<Item>().is_empty());
    }

    #[test]
    fn error_status_detected() {
        let payload = ToolPayload::parse(r#"{"status":"error","message":"boom"}"#);
        let status = payload.status().unwrap();
        assert!(status.is_error());
        assert_eq!(status.message.as_deref(), Some("boom"));
        assert!(status.id.is_none());
    }
}
