//! Pulling structured data out of free-form model replies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON array found in model reply")]
    NoArray,
    #[error("invalid JSON array in model reply: {0}")]
    Json(#[from] serde_json::Error),
}

/// A question/answer pair proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqPair {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

impl FaqPair {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.question.trim().is_empty() && !self.answer.trim().is_empty()
    }
}

/// Slice from the first `[` to the last `]`, if both exist in that order.
#[must_use]
pub fn json_array_span(reply: &str) -> Option<&str> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    (end > start).then(|| &reply[start..=end])
}

/// Decode the outermost JSON array embedded in `reply`.
///
/// # Errors
///
/// Returns [`ExtractError::NoArray`] when no bracketed span exists and
/// [`ExtractError::Json`] when the span does not decode into `Vec<T>`.
pub fn extract_json_array<T: DeserializeOwned>(reply: &str) -> Result<Vec<T>, ExtractError> {
    let span = json_array_span(reply).ok_or(ExtractError::NoArray)?;
    Ok(serde_json::from_str(span)?)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn array_surrounded_by_prose() {
        let reply = "Sure! Here you go:\n[\"a\", \"b\"]\nHope that helps.";
        let out: Vec<String> = extract_json_array(reply).unwrap();
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn fenced_faq_array() {
        let reply = "```json\n[{\"question\": \"Q?\", \"answer\": \"A\"}]\n```";
        let out: Vec<FaqPair> = extract_json_array(reply).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_complete());
    }

    #[test]
    fn missing_brackets_is_no_array() {
        assert!(matches!(
            extract_json_array::<String>("no json here"),
            Err(ExtractError::NoArray)
        ));
        assert!(matches!(
            extract_json_array::<String>("] backwards ["),
            Err(ExtractError::NoArray)
        ));
    }

    #[test]
    fn malformed_array_is_json_error() {
        assert!(matches!(
            extract_json_array::<String>("[\"unterminated]"),
            Err(ExtractError::Json(_))
        ));
    }

    #[test]
    fn incomplete_pairs_detected() {
        let out: Vec<FaqPair> =
            extract_json_array(r#"[{"question": "Q?"}, {"question": " ", "answer": "A"}]"#)
                .unwrap();
        assert!(out.iter().all(|p| !p.is_complete()));
    }

    proptest! {
        #[test]
        fn span_is_bracketed(s in ".{0,200}") {
            if let Some(span) = json_array_span(&s) {
                prop_assert!(span.starts_with('['));
                prop_assert!(span.ends_with(']'));
            }
        }
    }
}
