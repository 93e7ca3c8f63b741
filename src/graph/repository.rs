// src/graph/repository.rs

//! File-repository collaborator: attaches raw file content to data nodes.
//!
//! Content-addressing and deduplication are the repository's concern, not
//! the engine's. The engine only needs `add_path` / `open` by relative name
//! and a listing for content hashing.

use std::collections::BTreeMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::errors::{ProvrunError, Result};

/// Contract for attaching file payloads to data nodes.
pub trait FileRepository: Send + Sync {
    /// Attach `content` to `node` under the relative `name`.
    fn add_path(&self, node: Uuid, name: &str, content: &[u8]) -> Result<()>;

    /// Read back content previously attached under `name`.
    fn open(&self, node: Uuid, name: &str) -> Result<Vec<u8>>;

    /// Relative names attached to `node`, sorted.
    fn list(&self, node: Uuid) -> Result<Vec<String>>;
}

/// In-memory reference implementation of [`FileRepository`].
#[derive(Default)]
pub struct MemoryRepository {
    objects: Mutex<BTreeMap<(Uuid, String), Vec<u8>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileRepository for MemoryRepository {
    fn add_path(&self, node: Uuid, name: &str, content: &[u8]) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| ProvrunError::Storage("repository lock poisoned".to_string()))?;
        objects.insert((node, name.to_string()), content.to_vec());
        Ok(())
    }

    fn open(&self, node: Uuid, name: &str) -> Result<Vec<u8>> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| ProvrunError::Storage("repository lock poisoned".to_string()))?;
        objects
            .get(&(node, name.to_string()))
            .cloned()
            .ok_or_else(|| {
                ProvrunError::Storage(format!("no file '{name}' attached to node {node}"))
            })
    }

    fn list(&self, node: Uuid) -> Result<Vec<String>> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| ProvrunError::Storage("repository lock poisoned".to_string()))?;
        Ok(objects
            .keys()
            .filter(|(id, _)| *id == node)
            .map(|(_, name)| name.clone())
            .collect())
    }
}
