use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use formforge_core::{ids::DocumentId, tree::FieldTree};

use crate::config::AutosaveConfig;
use crate::persistence::{PersistError, Persistence};

/// Save indicator shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Saved,
    Unsaved,
    Saving,
}

/// The most recent tree the session published, tagged with its edit count.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub revision: u64,
    pub tree: FieldTree,
}

pub(crate) type FlushReply = oneshot::Sender<Result<(), PersistError>>;

pub(crate) enum SaverCommand {
    Edited,
    Flush(FlushReply),
    Shutdown(FlushReply),
}

struct FlushDone {
    revision: u64,
    result: Result<(), PersistError>,
}

/// Background task owning the flush policy for one document.
///
/// Edits arm a debounce deadline and count towards the size bound; whichever
/// fires first starts a flush of the latest snapshot. At most one flush runs
/// at a time: triggers that arrive meanwhile mark a pending flush, started as
/// soon as the current one reports back.
pub(crate) struct Saver {
    document_id: DocumentId,
    persistence: Arc<dyn Persistence>,
    config: AutosaveConfig,
    latest: watch::Receiver<Snapshot>,
    status: Arc<watch::Sender<SaveStatus>>,
    commands: mpsc::UnboundedReceiver<SaverCommand>,
    done_tx: mpsc::UnboundedSender<FlushDone>,
    done_rx: mpsc::UnboundedReceiver<FlushDone>,

    queued: usize,
    deadline: Option<Instant>,
    in_flight: Option<u64>,
    pending: bool,
    saved_revision: u64,
    /// Force-save callers served by the next flush to start.
    waiting: Vec<FlushReply>,
    /// Force-save callers served by the flush in flight.
    flushing: Vec<FlushReply>,
    closing: bool,
    close_reply: Option<FlushReply>,
    last_result: Result<(), PersistError>,
}

impl Saver {
    pub(crate) fn new(
        document_id: DocumentId,
        persistence: Arc<dyn Persistence>,
        config: AutosaveConfig,
        latest: watch::Receiver<Snapshot>,
        status: Arc<watch::Sender<SaveStatus>>,
        commands: mpsc::UnboundedReceiver<SaverCommand>,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        // the tree a session opens with is taken as already persisted
        let saved_revision = latest.borrow().revision;
        Self {
            document_id,
            persistence,
            config,
            latest,
            status,
            commands,
            done_tx,
            done_rx,
            queued: 0,
            deadline: None,
            in_flight: None,
            pending: false,
            saved_revision,
            waiting: Vec::new(),
            flushing: Vec::new(),
            closing: false,
            close_reply: None,
            last_result: Ok(()),
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv(), if !self.closing => match command {
                    Some(SaverCommand::Edited) => self.on_edit(),
                    Some(SaverCommand::Flush(reply)) => {
                        self.waiting.push(reply);
                        self.trigger("forced");
                    }
                    Some(SaverCommand::Shutdown(reply)) => self.begin_close(Some(reply)),
                    None => self.begin_close(None),
                },
                Some(done) = self.done_rx.recv() => self.on_flush_done(done),
                () = wait_until(self.deadline) => {
                    self.deadline = None;
                    self.trigger("debounce");
                }
            }

            if self.closing && self.in_flight.is_none() {
                if let Some(reply) = self.close_reply.take() {
                    let _ = reply.send(self.last_result.clone());
                }
                tracing::debug!(document_id = %self.document_id, "autosave stopped");
                break;
            }
        }
    }

    fn on_edit(&mut self) {
        self.queued += 1;
        if self.queued >= self.config.max_queued {
            tracing::debug!(document_id = %self.document_id, queued = self.queued, "queue full");
            self.trigger("size");
        } else {
            self.deadline = Some(Instant::now() + self.config.debounce());
        }
    }

    /// True when the latest snapshot is saved or being saved.
    fn covered(&self) -> bool {
        let latest = self.latest.borrow().revision;
        latest == self.saved_revision || self.in_flight == Some(latest)
    }

    fn trigger(&mut self, reason: &'static str) {
        if self.waiting.is_empty() && self.covered() {
            self.queued = 0;
            self.deadline = None;
            return;
        }
        if self.in_flight.is_some() {
            tracing::debug!(document_id = %self.document_id, reason, "flush in flight, marking pending");
            self.pending = true;
        } else {
            self.start_flush(reason);
        }
    }

    fn start_flush(&mut self, reason: &'static str) {
        let Snapshot { revision, tree } = self.latest.borrow().clone();
        self.queued = 0;
        self.deadline = None;
        self.pending = false;
        self.in_flight = Some(revision);
        self.flushing = std::mem::take(&mut self.waiting);
        self.status.send_replace(SaveStatus::Saving);
        tracing::info!(
            document_id = %self.document_id,
            revision,
            reason,
            nodes = tree.len(),
            "flush started"
        );

        let persistence = Arc::clone(&self.persistence);
        let document_id = self.document_id;
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let save = tokio::spawn(async move { persistence.save(document_id, tree).await });
            let result = match save.await {
                Ok(result) => result,
                Err(e) => Err(PersistError::new(format!("flush task failed: {e}"))),
            };
            let _ = done.send(FlushDone { revision, result });
        });
    }

    fn on_flush_done(&mut self, done: FlushDone) {
        self.in_flight = None;
        match &done.result {
            Ok(()) => {
                self.saved_revision = done.revision;
                let latest = &self.latest;
                // edits since the snapshot keep the document unsaved
                self.status.send_modify(|status| {
                    *status = if latest.borrow().revision == done.revision {
                        SaveStatus::Saved
                    } else {
                        SaveStatus::Unsaved
                    };
                });
                tracing::info!(document_id = %self.document_id, revision = done.revision, "flush finished");
            }
            Err(e) => {
                self.status.send_replace(SaveStatus::Unsaved);
                tracing::warn!(
                    document_id = %self.document_id,
                    revision = done.revision,
                    error = %e,
                    "flush failed"
                );
            }
        }

        for reply in self.flushing.drain(..) {
            let _ = reply.send(done.result.clone());
        }
        self.last_result = done.result;

        if self.pending {
            self.start_flush("pending");
        }
    }

    fn begin_close(&mut self, reply: Option<FlushReply>) {
        self.closing = true;
        self.close_reply = reply;
        if self.in_flight.is_none() && self.covered() {
            self.last_result = Ok(());
        }
        self.trigger("close");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
