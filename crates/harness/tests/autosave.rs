use std::sync::Arc;
use std::time::Duration;

use formforge_core::{
    field_type::FieldType, ids::DocumentId, node::NodePatch, palette::Palette, tree::FieldTree,
};
use formforge_engine::{AutosaveConfig, EditorConfig, EditorSession, EngineError, Persistence, SaveStatus};
use formforge_harness::{init_tracing, leaf, FlakyPersistence, RecordingPersistence};
use tokio::time::{sleep, Instant};

fn config(debounce_ms: u64, max_queued: usize) -> EditorConfig {
    EditorConfig {
        autosave: AutosaveConfig { debounce_ms, max_queued },
        ..EditorConfig::default()
    }
}

fn open(persistence: Arc<dyn Persistence>, config: EditorConfig) -> Result<EditorSession, EngineError> {
    init_tracing();
    EditorSession::open(DocumentId::new(), FieldTree::new(), Palette::standard(), persistence, config)
}

fn add(session: &mut EditorSession, id: &str) -> Result<(), EngineError> {
    session.insert_field(leaf(id, FieldType::Text), None).map(|_| ())
}

#[tokio::test(start_paused = true)]
async fn size_bound_flush_then_debounce_flush() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = RecordingPersistence::new();
    let mut session = open(Arc::new(persistence.clone()), config(2000, 3))?;
    let start = Instant::now();

    for i in 1..=5 {
        add(&mut session, &format!("f{i}"))?;
        sleep(Duration::from_millis(20)).await;
    }

    let saves = persistence.saves();
    assert_eq!(saves.len(), 1, "only the size bound has fired");
    assert!(saves[0].tree.len() >= 3);
    assert!(saves[0].at - start < Duration::from_millis(100));
    assert_eq!(session.status(), SaveStatus::Unsaved);

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(persistence.save_count(), 1);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(persistence.save_count(), 2, "debounce caught edits 4 and 5");
    assert_eq!(persistence.last_tree(), Some(session.snapshot()));
    assert_eq!(session.status(), SaveStatus::Saved);

    session.close().await?;
    assert_eq!(persistence.save_count(), 2, "nothing left to flush on close");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn debounce_restarts_on_every_edit() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = RecordingPersistence::new();
    let mut session = open(Arc::new(persistence.clone()), config(500, 100))?;

    for i in 0..6 {
        add(&mut session, &format!("f{i}"))?;
        sleep(Duration::from_millis(400)).await;
        assert_eq!(persistence.save_count(), 0);
    }

    sleep(Duration::from_millis(200)).await;
    assert_eq!(persistence.save_count(), 1);
    assert_eq!(persistence.last_tree().map(|t| t.len()), Some(6));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn at_most_one_flush_in_flight() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = RecordingPersistence::with_latency(Duration::from_millis(500));
    let mut session = open(Arc::new(persistence.clone()), config(2000, 1))?;

    for i in 0..4 {
        add(&mut session, &format!("f{i}"))?;
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(persistence.save_count(), 1, "later triggers wait for the first flush");

    sleep(Duration::from_millis(1200)).await;
    assert_eq!(persistence.max_concurrent(), 1);
    assert_eq!(persistence.save_count(), 2, "triggers during a flush coalesce into one");
    assert_eq!(persistence.last_tree().map(|t| t.len()), Some(4));
    assert_eq!(session.status(), SaveStatus::Saved);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn edit_during_flush_keeps_document_unsaved() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = RecordingPersistence::with_latency(Duration::from_millis(500));
    let mut session = open(Arc::new(persistence.clone()), config(100, 10))?;

    add(&mut session, "a")?;
    sleep(Duration::from_millis(150)).await;
    assert_eq!(session.status(), SaveStatus::Saving);

    add(&mut session, "b")?;
    assert_eq!(session.status(), SaveStatus::Unsaved);

    // first flush lands at 600ms carrying only "a"
    sleep(Duration::from_millis(460)).await;
    assert_eq!(persistence.saves()[0].tree.len(), 1);
    assert_ne!(session.status(), SaveStatus::Saved);

    sleep(Duration::from_millis(600)).await;
    assert_eq!(persistence.save_count(), 2);
    assert_eq!(persistence.last_tree(), Some(session.snapshot()));
    assert_eq!(session.status(), SaveStatus::Saved);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn force_save_skips_debounce() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = RecordingPersistence::new();
    let mut session = open(Arc::new(persistence.clone()), config(2000, 10))?;
    let start = Instant::now();

    add(&mut session, "a")?;
    session.force_save().await?;
    assert_eq!(persistence.save_count(), 1);
    assert!(start.elapsed() < Duration::from_millis(2000));
    assert_eq!(session.status(), SaveStatus::Saved);

    // the armed deadline has nothing new to send
    sleep(Duration::from_millis(3000)).await;
    assert_eq!(persistence.save_count(), 1);

    // forcing from the saved state still writes
    session.force_save().await?;
    assert_eq!(persistence.save_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_flush_is_not_retried() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = FlakyPersistence::failing(1);
    let mut session = open(Arc::new(persistence.clone()), config(200, 10))?;

    add(&mut session, "a")?;
    sleep(Duration::from_millis(300)).await;
    assert_eq!(persistence.attempts(), 1);
    assert_eq!(session.status(), SaveStatus::Unsaved);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(persistence.attempts(), 1, "no retry loop");
    assert_eq!(session.tree().len(), 1, "local tree untouched");

    // a later edit re-arms the scheduler
    add(&mut session, "b")?;
    sleep(Duration::from_millis(300)).await;
    assert_eq!(persistence.attempts(), 2);
    assert_eq!(persistence.recorded().last_tree().map(|t| t.len()), Some(2));
    assert_eq!(session.status(), SaveStatus::Saved);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn force_save_reports_failure() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = FlakyPersistence::default();
    let mut session = open(Arc::new(persistence.clone()), config(2000, 10))?;
    add(&mut session, "a")?;

    persistence.fail_next(1);
    let err = session.force_save().await.unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));
    assert_eq!(session.status(), SaveStatus::Unsaved);

    session.force_save().await?;
    assert_eq!(session.status(), SaveStatus::Saved);
    assert_eq!(persistence.recorded().save_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn no_op_edits_stay_saved() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = RecordingPersistence::new();
    let mut session = open(Arc::new(persistence.clone()), config(100, 1))?;

    assert!(!session.update_field(&"ghost".into(), &NodePatch::new().label("x")));
    assert!(!session.remove_field(&"ghost".into()));
    assert!(!session.undo());
    assert_eq!(session.status(), SaveStatus::Saved);
    assert_eq!(session.revision(), 0);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(persistence.save_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn close_flushes_outstanding_edits() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = RecordingPersistence::new();
    let mut session = open(Arc::new(persistence.clone()), config(60_000, 100))?;
    add(&mut session, "a")?;
    add(&mut session, "b")?;
    let expected = session.snapshot();

    session.close().await?;
    assert_eq!(persistence.save_count(), 1);
    assert_eq!(persistence.last_tree(), Some(expected));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn close_reports_final_flush_failure() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = FlakyPersistence::failing(1);
    let mut session = open(Arc::new(persistence.clone()), config(60_000, 100))?;
    add(&mut session, "a")?;

    assert!(matches!(session.close().await, Err(EngineError::Persistence(_))));
    assert_eq!(persistence.attempts(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn status_changes_are_observable() -> Result<(), Box<dyn std::error::Error>> {
    let persistence = RecordingPersistence::new();
    let mut session = open(Arc::new(persistence.clone()), config(100, 10))?;
    let mut status = session.subscribe_status();
    assert_eq!(*status.borrow_and_update(), SaveStatus::Saved);

    add(&mut session, "a")?;
    status.changed().await?;
    assert_eq!(*status.borrow_and_update(), SaveStatus::Unsaved);

    let saved = status.wait_for(|s| *s == SaveStatus::Saved).await?;
    assert_eq!(*saved, SaveStatus::Saved);
    Ok(())
}
