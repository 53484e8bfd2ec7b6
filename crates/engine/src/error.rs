use formforge_core::CoreError;
use formforge_storage::StorageError;
use thiserror::Error;

use crate::persistence::PersistError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no tokio runtime available to run autosave")]
    NoRuntime,

    #[error("session closed")]
    SessionClosed,

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("field {0} does not hold rich content")]
    NotRichText(String),
}
