use formforge_core::{
    condition::{ConditionRule, Operator},
    field_type::FieldType,
    field_value::FieldValue,
    node::{Field, FieldNode},
    tree::FieldTree,
    CoreError, FieldValues,
};
use formforge_storage::{SqliteStorage, StorageError};

pub fn leaf(id: &str, field_type: FieldType) -> FieldNode {
    FieldNode::new(Field::of_type(id, field_type))
}

pub fn container(id: &str, field_type: FieldType, children: Vec<FieldNode>) -> FieldNode {
    FieldNode::with_children(Field::of_type(id, field_type), children)
}

pub fn group(id: &str, children: Vec<FieldNode>) -> FieldNode {
    container(id, FieldType::Group, children)
}

pub fn condition_block(id: &str, rule: Option<ConditionRule>, children: Vec<FieldNode>) -> FieldNode {
    let mut field = Field::of_type(id, FieldType::ConditionBlock);
    field.condition_rule = rule;
    FieldNode::with_children(field, children)
}

pub fn tree(nodes: Vec<FieldNode>) -> Result<FieldTree, CoreError> {
    FieldTree::from_nodes(nodes)
}

/// A small contact form:
///
/// ```text
/// name (text)
/// contact (group)
///   email (email)
///   phone (phone)
/// newsletter (boolean)
/// topics (condition block: newsletter eq "true")
///   topic (select)
///   row (flex row)
///     freq (radio)
/// ```
pub fn contact_form() -> Result<FieldTree, CoreError> {
    tree(vec![
        leaf("name", FieldType::Text),
        group(
            "contact",
            vec![leaf("email", FieldType::Email), leaf("phone", FieldType::Phone)],
        ),
        leaf("newsletter", FieldType::Boolean),
        condition_block(
            "topics",
            Some(ConditionRule::new("newsletter", Operator::Eq, "true")),
            vec![
                leaf("topic", FieldType::Select),
                container("row", FieldType::FlexRow, vec![leaf("freq", FieldType::Radio)]),
            ],
        ),
    ])
}

pub fn values<const N: usize>(pairs: [(&str, FieldValue); N]) -> FieldValues {
    pairs
        .into_iter()
        .map(|(id, value)| (id.into(), value))
        .collect()
}

/// Ids in pre-order, for compact shape assertions.
pub fn ids(tree: &FieldTree) -> Vec<String> {
    tree.flatten()
        .iter()
        .map(|flat| flat.id().as_str().to_owned())
        .collect()
}

/// A file-backed store in a fresh temporary directory. Keep the directory
/// alive for as long as the store is used.
pub fn temp_store() -> Result<(tempfile::TempDir, std::path::PathBuf, SqliteStorage), StorageError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("forms.db");
    let storage = SqliteStorage::open(&path)?;
    Ok((dir, path, storage))
}
