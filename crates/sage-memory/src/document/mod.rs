//! Plain-text document loading and chunking.

pub mod error;
pub mod loader;
pub mod splitter;
pub mod types;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

pub use error::DocumentError;
pub use loader::TextLoader;
pub use splitter::{SplitterConfig, TextSplitter, chunk_text};
pub use types::{Chunk, Document, DocumentMetadata};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Document, DocumentError>> + Send + 'a>>;

/// Reads a whole file into a single [`Document`].
pub trait DocumentLoader: Send + Sync {
    fn load<'a>(&'a self, path: &'a Path) -> LoadFuture<'a>;

    /// Extensions that map to a known content type; others load as plain text.
    fn supported_extensions(&self) -> &[&str];
}
