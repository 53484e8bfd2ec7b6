use std::sync::Arc;

use async_trait::async_trait;
use formforge_core::{
    condition::{ConditionRule, Operator},
    dnd::{Bounds, DragPayload, DropAction, DropEvent, IgnoreReason},
    field_type::FieldType,
    ids::{DocumentId, FieldId},
    node::NodePatch,
    palette::Palette,
    tree::{DropPosition, FieldTree, Placement},
};
use formforge_engine::{
    AutosaveConfig, ChannelEditor, EditorConfig, EditorSession, EngineError, HistoryConfig,
    RichContentEditor, SaveStatus,
};
use formforge_harness::{contact_form, ids, init_tracing, leaf, tree, RecordingPersistence};

fn open_with(t: FieldTree, config: EditorConfig) -> Result<(EditorSession, RecordingPersistence), EngineError> {
    init_tracing();
    let persistence = RecordingPersistence::new();
    let session = EditorSession::open(
        DocumentId::new(),
        t,
        Palette::standard(),
        Arc::new(persistence.clone()),
        config,
    )?;
    Ok((session, persistence))
}

fn open(t: FieldTree) -> Result<(EditorSession, RecordingPersistence), EngineError> {
    open_with(t, EditorConfig::default())
}

/// Answers every request with a fixed string.
struct ScriptedEditor(Option<&'static str>);

#[async_trait]
impl RichContentEditor for ScriptedEditor {
    async fn edit(&self, _field_id: &FieldId, _content: &str) -> Option<String> {
        self.0.map(str::to_owned)
    }
}

#[tokio::test]
async fn undo_and_redo_walk_history() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open(contact_form()?)?;
    let original = session.snapshot();

    assert!(session.remove_field(&"contact".into()));
    session.update_field(&"name".into(), &NodePatch::new().label("Name"));
    let edited = session.snapshot();
    assert_eq!(session.revision(), 2);

    assert!(session.undo());
    assert!(session.undo());
    assert_eq!(session.tree(), &original);
    assert!(!session.can_undo());
    assert!(session.can_redo());
    assert_eq!(session.revision(), 4, "undo counts as an edit");
    assert_eq!(session.status(), SaveStatus::Unsaved);

    assert!(session.redo());
    assert!(session.redo());
    assert_eq!(session.tree(), &edited);
    assert!(!session.redo());
    Ok(())
}

#[tokio::test]
async fn new_edit_discards_redo() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open(contact_form()?)?;
    session.remove_field(&"name".into());
    session.undo();
    assert!(session.can_redo());

    session.insert_field(leaf("extra", FieldType::Number), None)?;
    assert!(!session.can_redo());
    Ok(())
}

#[tokio::test]
async fn history_depth_is_configurable() -> Result<(), Box<dyn std::error::Error>> {
    let config = EditorConfig {
        history: HistoryConfig { max_depth: 2 },
        ..EditorConfig::default()
    };
    let (mut session, _) = open_with(FieldTree::new(), config)?;
    for id in ["a", "b", "c", "d"] {
        session.insert_field(leaf(id, FieldType::Text), None)?;
    }
    assert!(session.undo());
    assert!(session.undo());
    assert!(!session.undo());
    assert_eq!(ids(session.tree()), vec!["a", "b"]);
    Ok(())
}

#[tokio::test]
async fn snapshots_are_unaffected_by_later_edits() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open(contact_form()?)?;
    let before = session.snapshot();
    session.remove_field(&"topics".into());
    assert!(before.contains(&"freq".into()));
    assert!(!session.tree().contains(&"freq".into()));
    Ok(())
}

#[tokio::test]
async fn drops_route_through_session() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open(contact_form()?)?;

    let create = DropEvent::on_target(
        DragPayload::New { field_type: FieldType::Checkbox },
        "row",
        Bounds::new(0.0, 50.0),
        1.0,
    );
    let DropAction::Created(id) = session.apply_drop(&create) else {
        return Err("drop did not create a field".into());
    };
    assert_eq!(session.tree().parent_of(&id), Some(&FieldId::from("row")));
    assert_eq!(session.revision(), 1);

    let self_drop = DropEvent::on_target(
        DragPayload::Move { field_id: id.clone() },
        id.clone(),
        Bounds::new(0.0, 50.0),
        1.0,
    );
    assert_eq!(session.apply_drop(&self_drop), DropAction::Ignored(IgnoreReason::SelfDrop));
    assert_eq!(session.revision(), 1, "ignored drops are not edits");
    Ok(())
}

#[tokio::test]
async fn add_field_uses_palette_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open(contact_form()?)?;
    let placement = Placement::new("newsletter", DropPosition::After);
    let id = session
        .add_field(FieldType::Radio, Some(&placement))?
        .ok_or("radio missing from palette")?;

    let field = session.tree().get(&id).ok_or("new field missing")?;
    assert_eq!(field.label.as_deref(), Some(FieldType::Radio.display_name()));
    assert_eq!(field.config.options().map(<[_]>::len), Some(2));
    let roots: Vec<&FieldId> = session.tree().roots().collect();
    assert_eq!(roots[3], &id);
    Ok(())
}

#[tokio::test]
async fn duplicate_insert_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open(contact_form()?)?;
    let err = session.insert_field(leaf("email", FieldType::Email), None).unwrap_err();
    assert!(matches!(err, EngineError::Core(_)));
    assert_eq!(session.revision(), 0);
    assert_eq!(session.status(), SaveStatus::Saved);
    Ok(())
}

#[tokio::test]
async fn condition_rules_only_land_on_blocks() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open(contact_form()?)?;
    let rule = ConditionRule::new("name", Operator::Contains, "a");

    assert!(session.set_condition_rule(&"topics".into(), Some(rule.clone())));
    assert_eq!(
        session.tree().get(&"topics".into()).and_then(|f| f.condition_rule.clone()),
        Some(rule.clone())
    );
    assert!(!session.set_condition_rule(&"name".into(), Some(rule)));
    assert!(session.set_condition_rule(&"topics".into(), None));
    assert!(session.tree().get(&"topics".into()).ok_or("topics")?.condition_rule.is_none());
    session.tree().validate()?;
    Ok(())
}

#[tokio::test]
async fn rich_content_round_trip_through_channel() -> Result<(), Box<dyn std::error::Error>> {
    let t = tree(vec![leaf("bio", FieldType::RichText), leaf("name", FieldType::Text)])?;
    let (mut session, _) = open(t)?;
    let (editor, mut requests) = ChannelEditor::channel();

    let ui = tokio::spawn(async move {
        let request = requests.recv().await.ok_or("no request")?;
        if request.field_id.as_str() != "bio" || !request.content.is_empty() {
            return Err("unexpected request");
        }
        request.complete("<p>About me</p>");
        Ok(())
    });

    assert!(session.edit_rich_content(&"bio".into(), &editor).await?);
    ui.await??;
    let bio = session.tree().get(&"bio".into()).ok_or("bio missing")?;
    assert_eq!(bio.config.rich_text_content(), Some("<p>About me</p>"));
    assert_eq!(session.status(), SaveStatus::Unsaved);
    Ok(())
}

#[tokio::test]
async fn rich_content_dismissal_and_misuse() -> Result<(), Box<dyn std::error::Error>> {
    let t = tree(vec![leaf("bio", FieldType::RichText), leaf("name", FieldType::Text)])?;
    let (mut session, _) = open(t)?;

    assert!(!session.edit_rich_content(&"bio".into(), &ScriptedEditor(None)).await?);
    assert!(!session.edit_rich_content(&"bio".into(), &ScriptedEditor(Some(""))).await?, "unchanged content");
    assert_eq!(session.revision(), 0);

    let err = session.edit_rich_content(&"name".into(), &ScriptedEditor(Some("x"))).await.unwrap_err();
    assert!(matches!(err, EngineError::NotRichText(_)));
    let err = session.edit_rich_content(&"ghost".into(), &ScriptedEditor(Some("x"))).await.unwrap_err();
    assert!(matches!(err, EngineError::FieldNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_rejected_at_open() -> Result<(), Box<dyn std::error::Error>> {
    let config = EditorConfig {
        autosave: AutosaveConfig { debounce_ms: 10, max_queued: 0 },
        ..EditorConfig::default()
    };
    assert!(matches!(open_with(FieldTree::new(), config), Err(EngineError::Config(_))));

    let config = EditorConfig::from_toml_str("[autosave]\ndebounce_ms = 250\n\n[history]\nmax_depth = 5\n")?;
    let (session, _) = open_with(FieldTree::new(), config)?;
    session.close().await?;
    Ok(())
}

#[test]
fn open_needs_a_runtime() {
    let result = EditorSession::open(
        DocumentId::new(),
        FieldTree::new(),
        Palette::standard(),
        Arc::new(RecordingPersistence::new()),
        EditorConfig::default(),
    );
    assert!(matches!(result, Err(EngineError::NoRuntime)));
}

#[tokio::test]
async fn renderer_views_track_the_tree() -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _) = open(contact_form()?)?;
    assert_eq!(session.flatten().len(), 9);
    session.remove_field(&"row".into());
    let index = session.index();
    assert_eq!(index.len(), 7);
    assert!(index.get(&"freq".into()).is_none());
    assert_eq!(index.position(&"topic".into()), Some(6));
    Ok(())
}
