use std::time::Duration;

use serde::Deserialize;

use crate::error::EngineError;

/// Tunables of an editing session. Every key is optional in TOML.
///
/// ```toml
/// [autosave]
/// debounce_ms = 2000
/// max_queued = 10
///
/// [history]
/// max_depth = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub autosave: AutosaveConfig,
    pub history: HistoryConfig,
}

impl EditorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.autosave.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a flush.
    pub debounce_ms: u64,
    /// Edits queued since the last flush that force one immediately.
    pub max_queued: usize,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            max_queued: 10,
        }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_queued == 0 {
            return Err(EngineError::Config("autosave.max_queued must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}
