use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("duplicate field id: {0}")]
    DuplicateFieldId(String),

    #[error("invalid config for {field_type}: {reason}")]
    InvalidConfig { field_type: String, reason: String },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl CoreError {
    pub(crate) fn invalid_config(field_type: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field_type: field_type.to_string(),
            reason: reason.into(),
        }
    }
}
