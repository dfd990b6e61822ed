use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::embedding::{
    EmbedBatchFuture, EmbedFuture, EmbeddingProvider, normalize, zero_vector,
};
use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

/// OpenAI-compatible HTTP backend serving both chat completions and embeddings.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    embedding_model: Option<String>,
    dimension: usize,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("embedding_model", &self.embedding_model)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl Clone for OpenAiProvider {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
        }
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: String, mut base_url: String, model: String, max_tokens: u32) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            max_tokens,
            temperature: None,
            embedding_model: None,
            dimension: 0,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Enable the embeddings endpoint. Returned vectors must have `dimension` components.
    #[must_use]
    pub fn with_embedding(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.embedding_model = Some(model.into());
        self.dimension = dimension;
        self
    }

    async fn send_request(&self, messages: &[Message]) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            tracing::error!("OpenAI API error {status}: {text}");
            return Err(LlmError::Other(format!(
                "OpenAI API request failed (status {status})"
            )));
        }

        let resp: OpenAiChatResponse = serde_json::from_str(&text)?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }

    async fn send_embeddings(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or(LlmError::EmbedUnsupported { provider: "openai" })?;

        let body = EmbeddingRequest {
            input: inputs,
            model,
            dimensions: (self.dimension > 0).then_some(self.dimension),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            tracing::error!("OpenAI embedding API error {status}: {text}");
            return Err(LlmError::Other(format!(
                "OpenAI embedding request failed (status {status})"
            )));
        }

        let resp: EmbeddingResponse = serde_json::from_str(&text)?;
        self.collect_embeddings(resp, inputs.len())
    }

    fn collect_embeddings(
        &self,
        mut resp: EmbeddingResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        if resp.data.len() != expected {
            return Err(LlmError::EmptyResponse { provider: "openai" });
        }
        resp.data.sort_by_key(|d| d.index);

        resp.data
            .into_iter()
            .map(|d| {
                let mut vector = d.embedding;
                if vector.len() != self.dimension {
                    return Err(LlmError::Dimension {
                        expected: self.dimension,
                        actual: vector.len(),
                    });
                }
                normalize(&mut vector);
                Ok(vector)
            })
            .collect()
    }

    async fn embeddings_with_retry(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        match self.send_embeddings(inputs).await {
            Err(LlmError::RateLimited) => {
                tracing::warn!("OpenAI embeddings rate limited, retrying in 1s");
                tokio::time::sleep(Duration::from_secs(1)).await;
                self.send_embeddings(inputs).await
            }
            other => other,
        }
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        match self.send_request(messages).await {
            Ok(text) => Ok(text),
            Err(LlmError::RateLimited) => {
                tracing::warn!("OpenAI rate limited, retrying in 1s");
                tokio::time::sleep(Duration::from_secs(1)).await;
                self.send_request(messages).await
            }
            Err(e) => Err(e),
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }

    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        Box::pin(async move {
            if text.is_empty() {
                return Ok(zero_vector(self.dimension));
            }
            let mut out = self.embeddings_with_retry(&[text]).await?;
            out.pop().ok_or(LlmError::EmptyResponse { provider: "openai" })
        })
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedBatchFuture<'a> {
        Box::pin(async move {
            let mut out: Vec<Vec<f32>> = texts.iter().map(|_| zero_vector(self.dimension)).collect();

            let (slots, inputs): (Vec<usize>, Vec<&str>) = texts
                .iter()
                .enumerate()
                .filter(|(_, t)| !t.is_empty())
                .map(|(i, t)| (i, t.as_str()))
                .unzip();
            if inputs.is_empty() {
                return Ok(out);
            }

            let vectors = self.embeddings_with_retry(&inputs).await?;
            for (slot, vector) in slots.into_iter().zip(vectors) {
                out[slot] = vector;
            }
            Ok(out)
        })
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| ApiMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;

    fn test_provider() -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test-key".into(),
            "https://api.openai.com/v1".into(),
            "gpt-4o-mini".into(),
            1024,
        )
        .with_embedding("text-embedding-3-small", 3)
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let p = OpenAiProvider::new(
            "key".into(),
            "https://api.openai.com/v1///".into(),
            "m".into(),
            100,
        );
        assert_eq!(p.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", test_provider());
        assert!(!debug.contains("sk-test-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn convert_messages_keeps_roles() {
        let messages = vec![Message::system("s"), Message::new(Role::Assistant, "a")];
        let api = convert_messages(&messages);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[1].role, "assistant");
        assert_eq!(api[1].content, "a");
    }

    #[test]
    fn chat_request_omits_unset_temperature() {
        let api = convert_messages(&[]);
        let body = ChatRequest {
            model: "m",
            messages: &api,
            max_tokens: 10,
            temperature: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn collect_embeddings_sorts_by_index_and_normalizes() {
        let p = test_provider();
        let resp: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[
                {"index":1,"embedding":[0.0,2.0,0.0]},
                {"index":0,"embedding":[3.0,0.0,4.0]}
            ]}"#,
        )
        .unwrap();
        let out = p.collect_embeddings(resp, 2).unwrap();
        assert_eq!(out[1], vec![0.0, 1.0, 0.0]);
        assert!((out[0][0] - 0.6).abs() < 1e-6);
        assert!((out[0][2] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn collect_embeddings_rejects_wrong_dimension() {
        let p = test_provider();
        let resp: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0,0.0]}]}"#).unwrap();
        let err = p.collect_embeddings(resp, 1).unwrap_err();
        assert!(matches!(
            err,
            LlmError::Dimension {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn collect_embeddings_rejects_short_response() {
        let p = test_provider();
        let resp: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(p.collect_embeddings(resp, 1).is_err());
    }

    #[tokio::test]
    async fn embed_empty_text_skips_network() {
        let p = OpenAiProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), 10)
            .with_embedding("e", 4);
        let v = p.embed("").await.unwrap();
        assert_eq!(v, vec![0.0; 4]);
    }

    #[tokio::test]
    async fn embed_batch_of_empties_skips_network() {
        let p = OpenAiProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), 10)
            .with_embedding("e", 2);
        let out = p.embed_batch(&[String::new(), String::new()]).await.unwrap();
        assert_eq!(out, vec![vec![0.0; 2], vec![0.0; 2]]);
    }

    #[tokio::test]
    async fn embed_without_model_returns_error() {
        let p = OpenAiProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), 10);
        let err = p.embed("test").await.unwrap_err();
        assert!(err.to_string().contains("embedding not supported"));
    }

    #[tokio::test]
    async fn chat_unreachable_endpoint_errors() {
        let p = OpenAiProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), 10);
        assert!(p.chat(&[Message::user("test")]).await.is_err());
    }

    #[tokio::test]
    async fn embed_unreachable_endpoint_errors() {
        let p = OpenAiProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), 10)
            .with_embedding("e", 3);
        assert!(p.embed("test").await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires SAGE_LLM_API_KEY env var"]
    async fn integration_openai_chat() {
        let api_key = std::env::var("SAGE_LLM_API_KEY").expect("SAGE_LLM_API_KEY must be set");
        let provider = OpenAiProvider::new(
            api_key,
            "https://api.openai.com/v1".into(),
            "gpt-4o-mini".into(),
            64,
        );
        let response = provider
            .complete("Reply tersely.", "Reply with exactly: pong")
            .await
            .unwrap();
        assert!(response.to_lowercase().contains("pong"));
    }
}
