//! Runtime gating of condition blocks.
//!
//! Evaluation never touches the stored tree: a hidden block keeps its whole
//! subtree, it is only skipped when rendering and when collecting a submission.

use crate::condition::{evaluate, FieldValues};
use crate::field_type::FieldType;
use crate::ids::FieldId;
use crate::tree::{FieldTree, FlatField};

/// Fields a renderer should show, pre-order. A condition block is always
/// listed; its descendants only when its rule holds.
pub fn visible_fields<'a>(tree: &'a FieldTree, values: &FieldValues) -> Vec<FlatField<'a>> {
    let mut out = Vec::new();
    let mut hidden_below: Option<usize> = None;

    for flat in tree.flatten() {
        if let Some(depth) = hidden_below {
            if flat.depth > depth {
                continue;
            }
            hidden_below = None;
        }
        out.push(flat);
        if flat.field_type() == FieldType::ConditionBlock
            && !evaluate(flat.field.condition_rule.as_ref(), values)
        {
            hidden_below = Some(flat.depth);
        }
    }
    out
}

/// Whether `id` is currently shown: it exists and no condition block above it
/// evaluates false.
pub fn is_visible(tree: &FieldTree, values: &FieldValues, id: &FieldId) -> bool {
    if !tree.contains(id) {
        return false;
    }
    let mut current = tree.parent_of(id);
    while let Some(ancestor) = current {
        if let Some(field) = tree.get(ancestor) {
            if field.field_type() == FieldType::ConditionBlock
                && !evaluate(field.condition_rule.as_ref(), values)
            {
                return false;
            }
        }
        current = tree.parent_of(ancestor);
    }
    true
}

/// The values that would be submitted: only those of visible,
/// value-collecting fields.
pub fn submission(tree: &FieldTree, values: &FieldValues) -> FieldValues {
    visible_fields(tree, values)
        .into_iter()
        .filter(|flat| flat.field_type().collects_value())
        .filter_map(|flat| {
            values
                .get(flat.id())
                .map(|value| (flat.id().clone(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ConditionRule, Operator};
    use crate::field_value::FieldValue;
    use crate::node::{Field, FieldNode};

    fn form() -> FieldTree {
        FieldTree::from_nodes(vec![
            FieldNode::new(Field::of_type("has_pet", FieldType::Boolean)),
            FieldNode::with_children(
                Field::of_type("pet_block", FieldType::ConditionBlock)
                    .with_rule(ConditionRule::new("has_pet", Operator::Eq, "true")),
                vec![
                    FieldNode::new(Field::of_type("pet_name", FieldType::Text)),
                    FieldNode::with_children(
                        Field::of_type("dog_block", FieldType::ConditionBlock)
                            .with_rule(ConditionRule::new("pet_name", Operator::Eq, "Rex")),
                        vec![FieldNode::new(Field::of_type("breed", FieldType::Text))],
                    ),
                ],
            ),
            FieldNode::new(Field::of_type("email", FieldType::Email)),
        ])
        .unwrap()
    }

    fn values(pairs: &[(&str, FieldValue)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (FieldId::from(*k), v.clone()))
            .collect()
    }

    fn visible_ids(tree: &FieldTree, v: &FieldValues) -> Vec<String> {
        visible_fields(tree, v)
            .iter()
            .map(|f| f.id().to_string())
            .collect()
    }

    #[test]
    fn unanswered_condition_fails_open() {
        let tree = form();
        assert_eq!(visible_ids(&tree, &FieldValues::new()).len(), tree.len());
    }

    #[test]
    fn false_rule_hides_whole_branch() {
        let tree = form();
        let v = values(&[("has_pet", false.into())]);
        assert_eq!(visible_ids(&tree, &v), ["has_pet", "pet_block", "email"]);
        assert!(!is_visible(&tree, &v, &"breed".into()));
        // the stored tree still has every node
        assert_eq!(tree.flatten().len(), 6);
    }

    #[test]
    fn nested_rule_evaluated_independently() {
        let tree = form();
        let v = values(&[("has_pet", true.into()), ("pet_name", "Tom".into())]);
        assert_eq!(
            visible_ids(&tree, &v),
            ["has_pet", "pet_block", "pet_name", "dog_block", "email"]
        );
        assert!(is_visible(&tree, &v, &"pet_name".into()));
        assert!(!is_visible(&tree, &v, &"breed".into()));
    }

    #[test]
    fn submission_drops_hidden_values() {
        let tree = form();
        let v = values(&[
            ("has_pet", false.into()),
            ("pet_name", "Rex".into()),
            ("breed", "Collie".into()),
            ("email", "a@b.c".into()),
            ("not_in_tree", "x".into()),
        ]);
        let submitted = submission(&tree, &v);
        let keys: Vec<&str> = submitted.keys().map(FieldId::as_str).collect();
        assert_eq!(keys, ["email", "has_pet"]);
    }
}
