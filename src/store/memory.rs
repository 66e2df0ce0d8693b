// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use tracing::debug;

use crate::store::{ResourceReader, ResourceStore};

/// Stores resources in memory only.
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    map: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names currently stored, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl ResourceStore for MemoryResourceStore {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), bytes.to_vec());
        debug!(resource = %name, len = bytes.len(), "stored resource (memory)");
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let removed = self
            .map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some();
        if removed {
            debug!(resource = %name, "removed resource (memory)");
        }
        Ok(removed)
    }

    fn contains(&self, name: &str) -> bool {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl ResourceReader for MemoryResourceStore {
    fn get_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.read(name).ok().flatten()
    }

    fn is_available(&self, name: &str) -> bool {
        self.contains(name)
    }
}
