// src/loader/naming.rs

//! Mapping between module names and resource names.
//!
//! Module `app.util.Strings` is backed by resource `app/util/Strings.res`.

/// Extension of loadable artifacts.
pub const RESOURCE_EXTENSION: &str = "res";

/// Resource name backing `module`.
pub fn resource_name(module: &str) -> String {
    format!("{}.{}", module.replace('.', "/"), RESOURCE_EXTENSION)
}

/// Module backed by `resource`, or `None` if it is not an artifact.
pub fn module_name(resource: &str) -> Option<String> {
    let stem = resource.strip_suffix(RESOURCE_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() || stem.ends_with('/') {
        return None;
    }
    Some(stem.replace('/', "."))
}

/// Artifact name a compiler is expected to produce for `source`
/// (`app/Main.src` -> `app/Main.res`).
pub fn artifact_for_source(source: &str) -> String {
    let file_start = source.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem = match source[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &source[..file_start + dot],
        _ => source,
    };
    format!("{stem}.{RESOURCE_EXTENSION}")
}
