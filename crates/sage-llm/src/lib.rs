//! LLM and embedding provider abstractions with OpenAI-compatible and offline backends.

pub mod embedding;
pub mod error;
pub mod hashing;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;

pub use embedding::{EmbeddingProvider, normalize, zero_vector};
pub use error::LlmError;
pub use hashing::HashingEmbedder;
pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, Message, Role};
