use std::path::Path;

use super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentLoader, DocumentMetadata, LoadFuture,
};

/// Loads UTF-8 text and Markdown files whole.
#[derive(Debug, Clone)]
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md" | "markdown") => "text/markdown",
        _ => "text/plain",
    }
}

impl DocumentLoader for TextLoader {
    fn load<'a>(&'a self, path: &'a Path) -> LoadFuture<'a> {
        Box::pin(async move {
            let path = tokio::fs::canonicalize(path).await?;
            let size = tokio::fs::metadata(&path).await?.len();
            if size > self.max_file_size {
                return Err(DocumentError::FileTooLarge {
                    size,
                    limit: self.max_file_size,
                });
            }

            let bytes = tokio::fs::read(&path).await?;
            let content = String::from_utf8(bytes).map_err(|_| DocumentError::NotUtf8 {
                path: path.clone(),
            })?;

            tracing::debug!(file = %path.display(), bytes = size, "loaded document");
            Ok(Document {
                content,
                metadata: DocumentMetadata {
                    file_name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    file_path: path.display().to_string(),
                    file_size: size,
                    content_type: content_type(&path).to_owned(),
                },
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}
