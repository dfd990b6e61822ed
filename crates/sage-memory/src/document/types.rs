use crate::types::Metadata;

/// File-level facts recorded by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub content_type: String,
}

impl DocumentMetadata {
    /// Render as a metadata map suitable for merging into stored entries.
    #[must_use]
    pub fn to_metadata(&self) -> Metadata {
        let mut map = Metadata::new();
        map.insert("file_name".into(), self.file_name.clone().into());
        map.insert("file_path".into(), self.file_path.clone().into());
        map.insert("file_size".into(), self.file_size.into());
        map.insert("content_type".into(), self.content_type.clone().into());
        map
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub metadata: Metadata,
}

impl Chunk {
    /// Caller metadata with `chunk_index` and `total_chunks` merged in.
    #[must_use]
    pub fn stored_metadata(&self) -> Metadata {
        let mut map = self.metadata.clone();
        map.insert("chunk_index".into(), self.chunk_index.into());
        map.insert("total_chunks".into(), self.total_chunks.into());
        map
    }
}
