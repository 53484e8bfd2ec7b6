use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt document {document_id}: {reason}")]
    Corrupt { document_id: String, reason: String },

    #[error("core error: {0}")]
    Core(#[from] formforge_core::CoreError),
}
