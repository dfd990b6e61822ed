#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: &'static str },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_error_display() {
        let err = LlmError::Dimension {
            expected: 384,
            actual: 1536,
        };
        assert_eq!(
            err.to_string(),
            "embedding dimension mismatch: expected 384, got 1536"
        );
    }

    #[test]
    fn empty_response_display() {
        let err = LlmError::EmptyResponse { provider: "openai" };
        assert_eq!(err.to_string(), "empty response from openai");
    }
}
