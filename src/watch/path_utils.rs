// src/watch/path_utils.rs

//! Path helpers for the watcher.

use std::path::Path;

/// Directories whose changes never trigger anything: assetflow's own cache
/// and VCS metadata.
const IGNORED_PREFIXES: &[&str] = &[".assetflow/", ".git/"];

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Tries a direct `strip_prefix(root)` first and falls back to comparing
/// canonicalized paths (symlinked temp dirs on macOS report
/// `/private/var/...` for `/var/...`). Returns `None` if the path is not
/// below `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    // A deleted file cannot be canonicalized; canonicalize its parent.
    let path_canon = path.canonicalize().ok().or_else(|| {
        let parent = path.parent()?.canonicalize().ok()?;
        Some(parent.join(path.file_name()?))
    })?;
    let root_canon = root.canonicalize().ok()?;

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Whether a root-relative path lies in a directory the watcher ignores.
pub fn is_ignored(rel: &str) -> bool {
    IGNORED_PREFIXES.iter().any(|prefix| rel.starts_with(prefix))
}
