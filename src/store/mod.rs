// src/store/mod.rs

//! Addressable byte storage.
//!
//! Resource names are `/`-separated relative paths such as `"app/Main.res"`.
//! [`ResourceReader`] is the read-only view handed to compilers;
//! [`ResourceStore`] is where artifacts live and what the module loader reads.

use anyhow::Result;

pub mod directory;
pub mod memory;

pub use directory::DirectoryResourceStore;
pub use memory::MemoryResourceStore;

/// Read-only source of resources (typically source files).
pub trait ResourceReader: Send + Sync {
    fn get_bytes(&self, name: &str) -> Option<Vec<u8>>;
    fn is_available(&self, name: &str) -> bool;
}

/// Mutable artifact storage.
pub trait ResourceStore: Send + Sync {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// `Ok(None)` means the resource does not exist. Errors are reserved
    /// for storage failures.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Returns `false` if there was nothing to remove.
    fn remove(&self, name: &str) -> Result<bool>;

    fn contains(&self, name: &str) -> bool {
        matches!(self.read(name), Ok(Some(_)))
    }
}
