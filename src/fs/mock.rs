// src/fs/mock.rs

use super::{EntryMetadata, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Upper bound on link hops while resolving a path.
const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, modified: SystemTime },
    Dir(Vec<String>), // List of child names
    /// Symbolic link to another path in the mock tree.
    Link(PathBuf),
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockEntry>,
    /// Paths whose metadata lookups fail, simulating permission errors.
    denied: HashSet<PathBuf>,
    /// Logical clock used as mtime for writes, one second per write.
    clock: u64,
}

/// In-memory filesystem for tests.
///
/// Every write advances a logical clock, so a rewrite of a file always gets a
/// newer mtime even if the content length is unchanged.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(MockState {
                files,
                ..MockState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state.clock += 1;
        let modified = UNIX_EPOCH + Duration::from_secs(state.clock);
        let path = path.as_ref().to_path_buf();
        state.files.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified,
            },
        );
        Self::link_into_parent(&mut state.files, &path);
    }

    /// Create an empty directory (and its parents).
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        Self::ensure_dir_entry(&mut state.files, path.as_ref());
    }

    /// Create a symbolic link at `link` pointing to `target`.
    pub fn add_link(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        let mut state = self.lock();
        let link = link.as_ref().to_path_buf();
        state
            .files
            .insert(link.clone(), MockEntry::Link(target.as_ref().to_path_buf()));
        Self::link_into_parent(&mut state.files, &link);
    }

    /// Rewrite a file's mtime without touching its content.
    pub fn set_modified(&self, path: impl AsRef<Path>, at: SystemTime) {
        let mut state = self.lock();
        if let Some(MockEntry::File { modified, .. }) = state.files.get_mut(path.as_ref()) {
            *modified = at;
        }
    }

    /// Make metadata lookups for `path` fail.
    pub fn deny(&self, path: impl AsRef<Path>) {
        self.lock().denied.insert(path.as_ref().to_path_buf());
    }

    pub fn remove_entry(&self, path: impl AsRef<Path>) -> bool {
        let mut state = self.lock();
        let path = path.as_ref();
        let removed = state.files.remove(path).is_some();
        if removed {
            let parent = parent_of(path);
            if let (Some(name), Some(MockEntry::Dir(children))) = (
                path.file_name().and_then(|n| n.to_str()),
                state.files.get_mut(parent),
            ) {
                children.retain(|c| c != name);
            }
        }
        removed
    }

    fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        // Ensure parent directories exist implicitly for simplicity in this mock
        let parent = parent_of(path);
        if parent == path {
            return;
        }
        Self::ensure_dir_entry(files, parent);
        // Add this entry to parent's children
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.contains(&name.to_string()) {
                    children.push(name.to_string());
                }
            }
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if files.contains_key(path) {
            return;
        }
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        Self::link_into_parent(files, path);
    }

    /// Whether the last component of `path` is itself a link. Links in the
    /// parent components are followed.
    fn is_link(files: &HashMap<PathBuf, MockEntry>, path: &Path) -> Result<bool> {
        let Some(name) = path.file_name() else {
            return Ok(false);
        };
        let entry = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Self::resolve(files, parent)?.join(name),
            _ => path.to_path_buf(),
        };
        Ok(matches!(files.get(&entry), Some(MockEntry::Link(_))))
    }

    /// Follow links in every component of `path`.
    fn resolve(files: &HashMap<PathBuf, MockEntry>, path: &Path) -> Result<PathBuf> {
        let mut hops = 0;
        let mut resolved = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir if resolved.as_os_str().is_empty() => resolved.push("."),
                Component::CurDir => {}
                other => resolved.push(other.as_os_str()),
            }
            while let Some(MockEntry::Link(target)) = files.get(&resolved) {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(anyhow!("Too many levels of symbolic links: {:?}", path));
                }
                resolved = target.clone();
            }
        }
        Ok(resolved)
    }
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => path,
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        let state = self.lock();
        let resolved = Self::resolve(&state.files, path)?;
        match state.files.get(&resolved) {
            Some(MockEntry::File { content, .. }) => Ok(Some(content.clone())),
            Some(_) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Ok(None),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<bool> {
        if self.is_dir(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        Ok(self.remove_entry(path))
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        Self::resolve(&state.files, path)
            .map(|p| state.files.contains_key(&p))
            .unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.lock();
        Self::resolve(&state.files, path)
            .map(|p| matches!(state.files.get(&p), Some(MockEntry::File { .. })))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.lock();
        Self::resolve(&state.files, path)
            .map(|p| matches!(state.files.get(&p), Some(MockEntry::Dir(_))))
            .unwrap_or(false)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let state = self.lock();
        let resolved = Self::resolve(&state.files, path)?;
        if state.files.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(anyhow!("File not found: {:?}", path))
        }
    }

    fn metadata(&self, path: &Path) -> Result<EntryMetadata> {
        let state = self.lock();
        if state.denied.contains(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        let is_symlink = Self::is_link(&state.files, path)?;
        let resolved = Self::resolve(&state.files, path)?;
        match state.files.get(&resolved) {
            Some(MockEntry::File { content, modified }) => Ok(EntryMetadata {
                len: content.len() as u64,
                modified: *modified,
                is_dir: false,
                is_symlink,
            }),
            Some(MockEntry::Dir(_)) => Ok(EntryMetadata {
                len: 0,
                modified: UNIX_EPOCH,
                is_dir: true,
                is_symlink,
            }),
            Some(MockEntry::Link(_)) => Err(anyhow!("Dangling link: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        if state.denied.contains(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        let resolved = Self::resolve(&state.files, path)?;
        match state.files.get(&resolved) {
            // Children are reported under the path the caller used, like a
            // real `read_dir` through a symlink.
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
