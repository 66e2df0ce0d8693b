// src/loader/linker.rs

use tracing::trace;

/// The host's linking step: which other modules does an artifact refer to?
///
/// The loader resolves every reported name while defining the module and
/// records it as a dependency for cascading invalidation.
pub trait Linker: Send + Sync {
    fn references(&self, name: &str, bytes: &[u8]) -> Vec<String>;
}

/// Reads a header of `import <module>` lines.
///
/// The header ends at the first line that is neither blank nor an import:
///
/// ```text
/// import app.Base
/// import app.util.Strings
///
/// ...artifact body...
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportLinker;

impl Linker for ImportLinker {
    fn references(&self, name: &str, bytes: &[u8]) -> Vec<String> {
        let text = String::from_utf8_lossy(bytes);
        let mut refs = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.strip_prefix("import ") {
                Some(target) => {
                    let target = target.trim().trim_end_matches(';');
                    if !target.is_empty() && !refs.iter().any(|r| r == target) {
                        refs.push(target.to_string());
                    }
                }
                None => break,
            }
        }

        trace!(module = %name, ?refs, "linked references");
        refs
    }
}

/// Linker for artifacts that never reference anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl Linker for NoLinks {
    fn references(&self, _name: &str, _bytes: &[u8]) -> Vec<String> {
        Vec::new()
    }
}
