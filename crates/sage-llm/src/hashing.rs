//! Offline, deterministic embedder based on signed feature hashing.

use crate::embedding::{EmbedFuture, EmbeddingProvider, normalize, zero_vector};

/// Feature-hashing embedder: each lowercased alphanumeric token is hashed with
/// blake3 into one of `dimension` buckets with a hash-derived sign.
///
/// Texts sharing vocabulary land close under cosine similarity, which is enough
/// for running the whole pipeline without an external model.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// A zero `dimension` is clamped to 1.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[must_use]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = zero_vector(self.dimension);
        if text.is_empty() {
            return vector;
        }

        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty());

        for token in tokens {
            self.accumulate(&mut vector, token.as_bytes());
        }
        // no tokens, or signed buckets cancelled out
        if vector.iter().all(|v| *v == 0.0) {
            self.accumulate(&mut vector, lowered.as_bytes());
        }

        normalize(&mut vector);
        vector
    }

    fn accumulate(&self, vector: &mut [f32], token: &[u8]) {
        let hash = blake3::hash(token);
        let bytes = hash.as_bytes();
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        let h = u64::from_le_bytes(word);

        #[allow(clippy::cast_possible_truncation)]
        let bucket = (h % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        let vector = self.embed_sync(text);
        Box::pin(async move { Ok(vector) })
    }
}
