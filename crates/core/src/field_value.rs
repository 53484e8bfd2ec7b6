use serde::{Deserialize, Serialize};

/// A value entered into a form field at runtime. Condition rules compare
/// against these after coercing them to a string or a number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b).is_eq(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// String form used by equality and substring rules. Lists join with
    /// commas, null becomes the empty string.
    pub fn coerce_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Float(f) => format_float(*f),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(","),
        }
    }

    /// Numeric form used by ordering rules. `None` when the value has no
    /// numeric reading, which makes every ordering comparison false.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            FieldValue::Null => Some(0.0),
            FieldValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Float(f) if f.is_nan() => None,
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => parse_number(s),
            FieldValue::List(items) => match items.as_slice() {
                [] => Some(0.0),
                [single] => parse_number(single),
                _ => None,
            },
        }
    }
}

/// Parses a number the lenient way form inputs need: surrounding whitespace
/// is ignored and a blank string reads as zero.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_nan() => None,
        Ok(n) => Some(n),
        Err(_) => None,
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        f.to_string()
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}
