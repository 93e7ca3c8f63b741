// src/config/validate.rs

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::{ProvrunError, Result};
use crate::types::CheckpointStorageMode;

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = ProvrunError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(EngineConfig::new_unchecked(raw.checkpoint, raw.caching))
    }
}

fn validate_raw_config(cfg: &RawEngineConfig) -> Result<()> {
    if cfg.checkpoint.storage == CheckpointStorageMode::Memory {
        if let Some(dir) = &cfg.checkpoint.dir {
            return Err(ProvrunError::Configuration(format!(
                "[checkpoint].dir = {dir:?} has no effect with storage = \"memory\"; \
                 set storage = \"file\" or drop the dir"
            )));
        }
    }

    if let Some(dir) = &cfg.checkpoint.dir {
        if dir.as_os_str().is_empty() {
            return Err(ProvrunError::Configuration(
                "[checkpoint].dir must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
