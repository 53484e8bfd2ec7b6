use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::field_value::{parse_number, FieldValue};
use crate::ids::FieldId;

/// Current form values keyed by the field that produced them.
pub type FieldValues = BTreeMap<FieldId, FieldValue>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Contains,
    Gt,
    Lt,
    /// An operator name this build does not know. Kept verbatim so stored
    /// documents round-trip; always evaluates to visible.
    Other(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Contains => "contains",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Other(name) => name,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "contains" => Self::Contains,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

/// Visibility rule attached to a condition block. `field_id` may point at any
/// node in the tree; nothing checks that it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRule {
    pub field_id: FieldId,
    pub operator: Operator,
    pub value: String,
}

impl ConditionRule {
    pub fn new(field_id: impl Into<FieldId>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Decides whether content gated by `rule` is visible.
///
/// Fails open: a missing rule, a rule whose field has no value yet, and an
/// unrecognised operator all evaluate to `true`.
pub fn evaluate(rule: Option<&ConditionRule>, values: &FieldValues) -> bool {
    let Some(rule) = rule else {
        return true;
    };
    let Some(actual) = values.get(&rule.field_id) else {
        return true;
    };

    match &rule.operator {
        Operator::Eq => actual.coerce_string() == rule.value,
        Operator::Neq => actual.coerce_string() != rule.value,
        Operator::Contains => actual.coerce_string().contains(rule.value.as_str()),
        Operator::Gt => compare_numbers(actual, &rule.value, |a, b| a > b),
        Operator::Lt => compare_numbers(actual, &rule.value, |a, b| a < b),
        Operator::Other(name) => {
            tracing::trace!(operator = %name, field_id = %rule.field_id, "unknown operator, treating as visible");
            true
        }
    }
}

fn compare_numbers(actual: &FieldValue, expected: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.coerce_number(), parse_number(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}
