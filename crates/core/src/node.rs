use serde::{Deserialize, Serialize};

use crate::condition::ConditionRule;
use crate::config::FieldConfig;
use crate::field_type::FieldType;
use crate::ids::FieldId;

/// A single field definition: everything about a node except its children.
///
/// The `type` tag is carried by `config`, so the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    #[serde(flatten)]
    pub config: FieldConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_rule: Option<ConditionRule>,
}

impl Field {
    pub fn new(id: impl Into<FieldId>, config: FieldConfig) -> Self {
        Self {
            id: id.into(),
            config,
            label: None,
            required: false,
            help_text: None,
            placeholder: None,
            condition_rule: None,
        }
    }

    pub fn of_type(id: impl Into<FieldId>, field_type: FieldType) -> Self {
        Self::new(id, FieldConfig::defaults_for(field_type))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_rule(mut self, rule: ConditionRule) -> Self {
        self.condition_rule = Some(rule);
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.config.field_type()
    }

    pub fn is_container(&self) -> bool {
        self.field_type().is_container()
    }

    /// Shallow-merges `patch` into this field. `id` and `type` never change:
    /// a replacement config of a different type, or a condition rule on a
    /// non condition-block field, is ignored. Returns whether anything changed.
    pub fn apply(&mut self, patch: &NodePatch) -> bool {
        let mut changed = false;

        if let Some(label) = &patch.label {
            changed |= replace(&mut self.label, label.clone());
        }
        if let Some(required) = patch.required {
            changed |= replace(&mut self.required, required);
        }
        if let Some(help_text) = &patch.help_text {
            changed |= replace(&mut self.help_text, help_text.clone());
        }
        if let Some(placeholder) = &patch.placeholder {
            changed |= replace(&mut self.placeholder, placeholder.clone());
        }
        if let Some(config) = &patch.config {
            if config.field_type() == self.field_type() {
                changed |= replace(&mut self.config, config.clone());
            } else {
                tracing::warn!(
                    field_id = %self.id,
                    field_type = %self.field_type(),
                    patch_type = %config.field_type(),
                    "ignoring config patch of a different type"
                );
            }
        }
        if let Some(rule) = &patch.condition_rule {
            if self.field_type() == FieldType::ConditionBlock {
                changed |= replace(&mut self.condition_rule, rule.clone());
            } else {
                tracing::warn!(field_id = %self.id, "ignoring condition rule on non condition-block field");
            }
        }

        changed
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// A field together with its subtree, the nested form a document is stored
/// and exchanged in. Containers always carry a (possibly empty) `children` list;
/// leaves carry none unless something was inserted inside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    #[serde(flatten)]
    pub field: Field,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FieldNode>>,
}

impl FieldNode {
    /// Wraps `field`, giving containers an empty child list and leaves none.
    pub fn new(field: Field) -> Self {
        let children = field.is_container().then(Vec::new);
        Self { field, children }
    }

    pub fn with_children(field: Field, children: Vec<FieldNode>) -> Self {
        Self {
            field,
            children: Some(children),
        }
    }

    pub fn id(&self) -> &FieldId {
        &self.field.id
    }

    pub fn field_type(&self) -> FieldType {
        self.field.field_type()
    }

    /// Every id in this subtree, pre-order.
    pub fn ids(&self) -> Vec<&FieldId> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.id());
            if let Some(children) = &node.children {
                stack.extend(children.iter().rev());
            }
        }
        out
    }
}

/// A partial update for a field. Outer `None` leaves a property untouched;
/// `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub label: Option<Option<String>>,
    pub required: Option<bool>,
    pub help_text: Option<Option<String>>,
    pub placeholder: Option<Option<String>>,
    pub config: Option<FieldConfig>,
    pub condition_rule: Option<Option<ConditionRule>>,
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Some(label.into()));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(Some(help_text.into()));
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(Some(placeholder.into()));
        self
    }

    pub fn config(mut self, config: FieldConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn condition_rule(mut self, rule: Option<ConditionRule>) -> Self {
        self.condition_rule = Some(rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
