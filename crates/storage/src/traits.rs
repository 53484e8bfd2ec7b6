use formforge_core::{ids::DocumentId, tree::FieldTree};

use crate::error::StorageError;

/// Metadata of the stored copy of a document's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub document_id: DocumentId,
    /// Bumped each time a save changes the stored content.
    pub revision: u64,
    /// blake3 of the encoded tree.
    pub checksum: [u8; 32],
    pub node_count: u64,
    /// Milliseconds since the Unix epoch.
    pub saved_at: i64,
}

/// Holds one persisted tree per document. Saving replaces the stored tree
/// wholesale and is idempotent; there is no merging and no version check.
pub trait DocumentStore {
    fn save(&mut self, document_id: DocumentId, tree: &FieldTree)
        -> Result<DocumentRecord, StorageError>;

    fn load(&self, document_id: DocumentId) -> Result<Option<FieldTree>, StorageError>;

    fn record(&self, document_id: DocumentId) -> Result<Option<DocumentRecord>, StorageError>;

    /// Returns whether a document was removed.
    fn delete(&mut self, document_id: DocumentId) -> Result<bool, StorageError>;

    fn list(&self) -> Result<Vec<DocumentRecord>, StorageError>;
}

pub fn encode_tree(tree: &FieldTree) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec_named(tree).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub fn decode_tree(bytes: &[u8]) -> Result<FieldTree, StorageError> {
    rmp_serde::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub fn checksum(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}
