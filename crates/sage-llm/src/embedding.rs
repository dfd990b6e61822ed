//! Text → fixed-dimension vector interface consumed by the vector store.

use std::future::Future;
use std::pin::Pin;

use crate::error::LlmError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type EmbedFuture<'a> = BoxFuture<'a, Result<Vec<f32>, LlmError>>;

pub type EmbedBatchFuture<'a> = BoxFuture<'a, Result<Vec<Vec<f32>>, LlmError>>;

/// Embedding backend.
///
/// Implementations return unit-length vectors of exactly [`dimension`] components,
/// and the all-zero vector for empty input.
///
/// [`dimension`]: EmbeddingProvider::dimension
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    fn name(&self) -> &str;

    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a>;

    /// Embed many texts, preserving order. Empty entries map to zero vectors.
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedBatchFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                if text.is_empty() {
                    out.push(zero_vector(self.dimension()));
                } else {
                    out.push(self.embed(text).await?);
                }
            }
            Ok(out)
        })
    }
}

#[must_use]
pub fn zero_vector(dimension: usize) -> Vec<f32> {
    vec![0.0; dimension]
}

/// Scale `vector` to unit L2 norm in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm_sq: f32 = vector.iter().map(|v| v * v).sum();
    if norm_sq > 0.0 {
        let inv = 1.0 / norm_sq.sqrt();
        for v in vector.iter_mut() {
            *v *= inv;
        }
    }
}
