pub mod autosave;
pub mod config;
pub mod error;
pub mod history;
pub mod persistence;
pub mod rich_content;

pub use autosave::SaveStatus;
pub use config::{AutosaveConfig, EditorConfig, HistoryConfig};
pub use error::EngineError;
pub use history::History;
pub use persistence::{PersistError, Persistence, StorePersistence};
pub use rich_content::{ChannelEditor, RichContentEditor, RichContentRequest};

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use formforge_core::{
    condition::ConditionRule,
    dnd::{self, DropAction, DropEvent},
    field_type::FieldType,
    ids::*,
    node::{FieldNode, NodePatch},
    palette::Palette,
    tree::{FieldIndex, FieldTree, FlatField, Placement},
};

use crate::autosave::{Saver, SaverCommand, Snapshot};

/// One user's editing session over one document.
///
/// Every mutation replaces the session's tree with a new value, records the
/// previous one for undo, marks the document unsaved and notifies the
/// background saver. Mutations that would not change the tree are ignored
/// entirely. Readers holding an earlier [`snapshot`](Self::snapshot) keep
/// seeing a consistent tree.
pub struct EditorSession {
    document_id: DocumentId,
    tree: FieldTree,
    palette: Palette,
    history: History,
    revision: u64,
    latest: watch::Sender<Snapshot>,
    status: Arc<watch::Sender<SaveStatus>>,
    commands: mpsc::UnboundedSender<SaverCommand>,
    saver: JoinHandle<()>,
}

impl EditorSession {
    /// Starts a session over `tree`, which is taken to be what `persistence`
    /// currently holds. Spawns the autosave task on the ambient tokio runtime.
    pub fn open(
        document_id: DocumentId,
        tree: FieldTree,
        palette: Palette,
        persistence: Arc<dyn Persistence>,
        config: EditorConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let (latest, latest_rx) = watch::channel(Snapshot {
            revision: 0,
            tree: tree.clone(),
        });
        let (status, _) = watch::channel(SaveStatus::Saved);
        let status = Arc::new(status);
        let (commands, commands_rx) = mpsc::unbounded_channel();

        let saver = Saver::new(
            document_id,
            persistence,
            config.autosave.clone(),
            latest_rx,
            Arc::clone(&status),
            commands_rx,
        );
        let saver = runtime.spawn(saver.run());

        tracing::info!(
            document_id = %document_id,
            nodes = tree.len(),
            debounce_ms = config.autosave.debounce_ms,
            max_queued = config.autosave.max_queued,
            "session opened"
        );

        Ok(Self {
            document_id,
            tree,
            palette,
            history: History::new(config.history.max_depth),
            revision: 0,
            latest,
            status,
            commands,
            saver,
        })
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn tree(&self) -> &FieldTree {
        &self.tree
    }

    /// An owned copy of the current tree, unaffected by later edits.
    pub fn snapshot(&self) -> FieldTree {
        self.tree.clone()
    }

    pub fn index(&self) -> FieldIndex<'_> {
        self.tree.index()
    }

    pub fn flatten(&self) -> Vec<FlatField<'_>> {
        self.tree.flatten()
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Number of edits applied since the session opened, undo/redo included.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.undo_depth() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history.redo_depth() > 0
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Returns whether the field existed and the patch changed it.
    pub fn update_field(&mut self, id: &FieldId, patch: &NodePatch) -> bool {
        match self.tree.try_update_node(id, patch) {
            Some(next) => {
                self.commit(next);
                tracing::debug!(document_id = %self.document_id, field_id = %id, revision = self.revision, "field updated");
                true
            }
            None => {
                tracing::debug!(document_id = %self.document_id, field_id = %id, "update had no effect");
                false
            }
        }
    }

    /// Removes the field and everything nested under it.
    pub fn remove_field(&mut self, id: &FieldId) -> bool {
        match self.tree.try_remove_node(id) {
            Some(next) => {
                self.commit(next);
                tracing::debug!(document_id = %self.document_id, field_id = %id, revision = self.revision, "field removed");
                true
            }
            None => false,
        }
    }

    pub fn insert_field(
        &mut self,
        node: FieldNode,
        placement: Option<&Placement>,
    ) -> Result<FieldId, EngineError> {
        let id = node.id().clone();
        let next = self.tree.insert_node(node, placement)?;
        self.commit(next);
        tracing::debug!(document_id = %self.document_id, field_id = %id, revision = self.revision, "field inserted");
        Ok(id)
    }

    /// Creates a fresh field from the palette, as a click on a palette entry
    /// would. `None` if the palette does not offer `field_type`.
    pub fn add_field(
        &mut self,
        field_type: FieldType,
        placement: Option<&Placement>,
    ) -> Result<Option<FieldId>, EngineError> {
        let Some(node) = self.palette.create_field(field_type, &self.tree) else {
            return Ok(None);
        };
        self.insert_field(node, placement).map(Some)
    }

    pub fn apply_drop(&mut self, event: &DropEvent) -> DropAction {
        let outcome = dnd::apply_drop(&self.tree, &self.palette, event);
        if outcome.changed() && outcome.tree != self.tree {
            self.commit(outcome.tree);
            tracing::debug!(document_id = %self.document_id, action = ?outcome.action, revision = self.revision, "drop applied");
        }
        outcome.action
    }

    /// Sets or clears the rule of a condition block.
    pub fn set_condition_rule(&mut self, block_id: &FieldId, rule: Option<ConditionRule>) -> bool {
        self.update_field(block_id, &NodePatch::new().condition_rule(rule))
    }

    /// Opens `editor` on a rich-text field and stores whatever content it
    /// returns. `Ok(false)` when the editor was dismissed or returned the
    /// content unchanged.
    ///
    /// The session stays mutably borrowed until the editor resolves, so no
    /// other edit can land while it is open.
    pub async fn edit_rich_content(
        &mut self,
        id: &FieldId,
        editor: &dyn RichContentEditor,
    ) -> Result<bool, EngineError> {
        let field = self
            .tree
            .get(id)
            .ok_or_else(|| EngineError::FieldNotFound(id.to_string()))?;
        let current = field
            .config
            .rich_text_content()
            .ok_or_else(|| EngineError::NotRichText(id.to_string()))?
            .to_owned();
        let mut config = field.config.clone();

        let Some(content) = editor.edit(id, &current).await else {
            tracing::debug!(document_id = %self.document_id, field_id = %id, "rich content edit dismissed");
            return Ok(false);
        };
        config.set_rich_text_content(content);
        Ok(self.update_field(id, &NodePatch::new().config(config)))
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(self.tree.clone()) else {
            return false;
        };
        self.tree = previous;
        self.publish();
        tracing::debug!(document_id = %self.document_id, revision = self.revision, "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.tree.clone()) else {
            return false;
        };
        self.tree = next;
        self.publish();
        tracing::debug!(document_id = %self.document_id, revision = self.revision, "redo");
        true
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Flushes the current tree now, regardless of the debounce window, and
    /// waits for the result.
    pub async fn force_save(&self) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SaverCommand::Flush(reply))
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)??;
        Ok(())
    }

    /// Flushes outstanding edits and stops the autosave task. Returns the
    /// result of the final flush.
    pub async fn close(self) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SaverCommand::Shutdown(reply))
            .map_err(|_| EngineError::SessionClosed)?;
        let result = rx.await.map_err(|_| EngineError::SessionClosed)?;
        if let Err(e) = self.saver.await {
            tracing::warn!(document_id = %self.document_id, error = %e, "autosave task ended abnormally");
        }
        tracing::info!(document_id = %self.document_id, revision = self.revision, "session closed");
        Ok(result?)
    }

    fn commit(&mut self, next: FieldTree) {
        let previous = std::mem::replace(&mut self.tree, next);
        self.history.record(previous);
        self.publish();
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.latest.send_replace(Snapshot {
            revision: self.revision,
            tree: self.tree.clone(),
        });
        self.status.send_replace(SaveStatus::Unsaved);
        if self.commands.send(SaverCommand::Edited).is_err() {
            tracing::warn!(document_id = %self.document_id, "autosave task is gone, edit stays local");
        }
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("document_id", &self.document_id)
            .field("revision", &self.revision)
            .field("nodes", &self.tree.len())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
