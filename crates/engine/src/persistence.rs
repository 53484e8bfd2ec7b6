use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use formforge_core::{ids::DocumentId, tree::FieldTree};
use formforge_storage::{DocumentRecord, DocumentStore};

use crate::error::EngineError;

/// Why a flush did not reach durable storage. Cloned to every caller waiting
/// on the same flush.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PersistError(pub String);

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Destination of autosave flushes. `save` must be an idempotent full
/// replace of whatever was stored for `document_id`.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    async fn save(&self, document_id: DocumentId, tree: FieldTree) -> Result<(), PersistError>;
}

/// Adapts a synchronous [`DocumentStore`] to [`Persistence`]; store calls
/// run on the blocking pool.
pub struct StorePersistence<S> {
    store: Arc<Mutex<S>>,
}

impl<S> Clone for StorePersistence<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore + Send + 'static> StorePersistence<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    pub async fn load(&self, document_id: DocumentId) -> Result<Option<FieldTree>, EngineError> {
        let store = Arc::clone(&self.store);
        let loaded = tokio::task::spawn_blocking(move || store.lock().load(document_id))
            .await
            .map_err(|e| PersistError::new(format!("load task failed: {e}")))??;
        Ok(loaded)
    }

    pub async fn record(&self, document_id: DocumentId) -> Result<Option<DocumentRecord>, EngineError> {
        let store = Arc::clone(&self.store);
        let record = tokio::task::spawn_blocking(move || store.lock().record(document_id))
            .await
            .map_err(|e| PersistError::new(format!("record task failed: {e}")))??;
        Ok(record)
    }
}

#[async_trait]
impl<S: DocumentStore + Send + 'static> Persistence for StorePersistence<S> {
    async fn save(&self, document_id: DocumentId, tree: FieldTree) -> Result<(), PersistError> {
        let store = Arc::clone(&self.store);
        let record = tokio::task::spawn_blocking(move || store.lock().save(document_id, &tree))
            .await
            .map_err(|e| PersistError::new(format!("save task failed: {e}")))?
            .map_err(|e| PersistError::new(e.to_string()))?;
        tracing::trace!(
            document_id = %document_id,
            revision = record.revision,
            "store accepted flush"
        );
        Ok(())
    }
}
