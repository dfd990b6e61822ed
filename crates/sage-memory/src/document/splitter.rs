use super::types::Chunk;
use crate::types::Metadata;

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split `text` into chunks, each carrying a copy of `metadata`.
    #[must_use]
    pub fn split(&self, text: &str, metadata: &Metadata) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let pieces = chunk_text(text, self.config.chunk_size, self.config.chunk_overlap);
        let total_chunks = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content,
                chunk_index,
                total_chunks,
                metadata: metadata.clone(),
            })
            .collect()
    }
}

/// Split `text` into segments of at most `max_size` chars, preferring to end on a
/// sentence terminator, with `overlap` chars shared between neighbours.
///
/// Text no longer than `max_size` comes back as a single segment. Every char of
/// the input lands in at least one segment.
#[must_use]
pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chunk_spans(&chars, max_size, overlap)
        .into_iter()
        .map(|(start, end)| chars[start..end].iter().collect())
        .collect()
}

/// Char-index spans `[start, end)` backing [`chunk_text`].
fn chunk_spans(chars: &[char], max_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let len = chars.len();
    let max_size = max_size.max(1);
    if len <= max_size {
        return vec![(0, len)];
    }

    let mut spans = Vec::new();
    let mut start = 0;
    loop {
        let raw_end = start + max_size;
        let end = if raw_end < len {
            sentence_cut(chars, start, raw_end).unwrap_or(raw_end)
        } else {
            len
        };
        spans.push((start, end));

        if end >= len {
            break;
        }

        let next = end.saturating_sub(overlap);
        if next <= start {
            // overlap swallowed all progress; keep the tail rather than drop it
            spans.push((end, len));
            break;
        }
        start = next;
    }
    spans
}

/// Position just past the last `.`/`?`/`!` followed by whitespace inside `(start, end)`.
fn sentence_cut(chars: &[char], start: usize, end: usize) -> Option<usize> {
    (start + 1..end.saturating_sub(1))
        .rev()
        .find(|&i| matches!(chars[i], '.' | '?' | '!') && chars[i + 1].is_whitespace())
        .map(|i| i + 1)
}
