use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use formforge_core::{ids::DocumentId, tree::FieldTree};
use formforge_engine::{PersistError, Persistence};

#[derive(Debug, Clone)]
pub struct SavedTree {
    pub document_id: DocumentId,
    pub tree: FieldTree,
    /// When the save call started.
    pub at: Instant,
}

/// Records every save it receives. Each save can be made to take a while,
/// and the number of saves running at once is tracked.
#[derive(Debug, Clone, Default)]
pub struct RecordingPersistence {
    saves: Arc<Mutex<Vec<SavedTree>>>,
    latency: Duration,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl RecordingPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> Vec<SavedTree> {
        self.saves.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }

    pub fn last_tree(&self) -> Option<FieldTree> {
        self.saves.lock().last().map(|saved| saved.tree.clone())
    }

    /// Highest number of saves that were ever running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Persistence for RecordingPersistence {
    async fn save(&self, document_id: DocumentId, tree: FieldTree) -> Result<(), PersistError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        self.saves.lock().push(SavedTree {
            document_id,
            tree,
            at: Instant::now(),
        });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails the next `n` saves, then records like [`RecordingPersistence`].
#[derive(Debug, Clone, Default)]
pub struct FlakyPersistence {
    failures_left: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
    inner: RecordingPersistence,
}

impl FlakyPersistence {
    pub fn failing(n: usize) -> Self {
        Self {
            failures_left: Arc::new(AtomicUsize::new(n)),
            ..Self::default()
        }
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> &RecordingPersistence {
        &self.inner
    }
}

#[async_trait]
impl Persistence for FlakyPersistence {
    async fn save(&self, document_id: DocumentId, tree: FieldTree) -> Result<(), PersistError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(PersistError::new("backend unavailable"));
        }
        self.inner.save(document_id, tree).await
    }
}
