use serde::{Deserialize, Serialize};

/// Free-form metadata attached to stored entries.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A knowledge search result, also the wire shape of `searchKnowledge` results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub content: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A FAQ search result, also the wire shape of `searchFAQ` results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqHit {
    pub question: String,
    pub answer: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Parse a stored metadata string. Anything but a JSON object yields an empty map.
#[must_use]
pub fn parse_metadata(raw: &str) -> Metadata {
    if raw.is_empty() {
        return Metadata::new();
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!("stored metadata is not a JSON object, ignoring");
            Metadata::new()
        }
        Err(e) => {
            tracing::warn!("failed to parse stored metadata: {e}");
            Metadata::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_metadata_object() {
        let map = parse_metadata(r#"{"title":"t","n":1}"#);
        assert_eq!(map["title"], "t");
        assert_eq!(map["n"], 1);
    }

    #[test]
    fn parse_metadata_garbage_is_empty() {
        assert!(parse_metadata("{not json").is_empty());
        assert!(parse_metadata("[1,2]").is_empty());
        assert!(parse_metadata("").is_empty());
    }

    #[test]
    fn faq_hit_missing_metadata_defaults() {
        let hit: FaqHit =
            serde_json::from_str(r#"{"question":"q","answer":"a","score":0.5}"#).unwrap();
        assert!(hit.metadata.is_empty());
    }
}
