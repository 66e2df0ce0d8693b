// src/store/directory.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::fs::{FileSystem, RealFileSystem};
use crate::store::{ResourceReader, ResourceStore};

/// Stores each resource as a file below `root`.
///
/// `"app/Main.res"` lives at `<root>/app/Main.res`.
#[derive(Debug, Clone)]
pub struct DirectoryResourceStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl DirectoryResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_filesystem(root, Arc::new(RealFileSystem))
    }

    pub fn with_filesystem(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a resource name onto the filesystem, refusing anything that
    /// would escape `root`.
    fn path_of(&self, name: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for part in name.split('/') {
            match part {
                "" | "." => continue,
                ".." => bail!("resource name escapes store root: {name:?}"),
                part => path.push(part),
            }
        }
        if path == self.root {
            bail!("empty resource name");
        }
        Ok(path)
    }
}

impl ResourceStore for DirectoryResourceStore {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_of(name)?;
        self.fs.write(&path, bytes)?;
        debug!(resource = %name, ?path, "stored resource (directory)");
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(name)?;
        self.fs.read(&path)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let path = self.path_of(name)?;
        self.fs.remove(&path)
    }

    fn contains(&self, name: &str) -> bool {
        self.path_of(name)
            .map(|p| self.fs.is_file(&p))
            .unwrap_or(false)
    }
}

impl ResourceReader for DirectoryResourceStore {
    fn get_bytes(&self, name: &str) -> Option<Vec<u8>> {
        match self.read(name) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(resource = %name, error = %err, "failed to read resource");
                None
            }
        }
    }

    fn is_available(&self, name: &str) -> bool {
        self.contains(name)
    }
}
