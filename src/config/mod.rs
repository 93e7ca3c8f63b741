// src/config/mod.rs

//! Engine configuration loaded from TOML.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{CachingSection, CheckpointSection, EngineConfig, RawEngineConfig};
