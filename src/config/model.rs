// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::CheckpointStorageMode;

/// `[checkpoint]` section: where suspended processes are persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointSection {
    pub storage: CheckpointStorageMode,
    /// Directory for file-backed checkpoints. Defaults to
    /// `.provrun/checkpoints` relative to the working directory.
    pub dir: Option<PathBuf>,
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self {
            storage: CheckpointStorageMode::default(),
            dir: None,
        }
    }
}

/// `[caching]` section: engine-wide default for cache substitution.
///
/// Individual process types can still opt in regardless of this default.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CachingSection {
    pub enabled: bool,
}

/// Raw deserialized configuration, before semantic validation.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawEngineConfig {
    pub checkpoint: CheckpointSection,
    pub caching: CachingSection,
}

/// Validated engine configuration.
///
/// Construct via `TryFrom<RawEngineConfig>` (see `config::validate`) or use
/// `EngineConfig::default()` for an all-in-memory engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub checkpoint: CheckpointSection,
    pub caching: CachingSection,
}

impl EngineConfig {
    pub(crate) fn new_unchecked(checkpoint: CheckpointSection, caching: CachingSection) -> Self {
        Self { checkpoint, caching }
    }
}
