// src/watch/path_utils.rs

//! Path helpers for the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (symlinked roots, `/private/var` vs `/var` on macOS) we
///   canonicalize both and try again. A deleted file cannot be
///   canonicalized, so its parent is canonicalized instead.
///
/// Returns `None` if the path is outside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(normalize(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(normalize)
}

fn normalize(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
