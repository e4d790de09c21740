// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Last seen content hash per file, used to drop change events that did not
/// change anything (editors that rewrite a file on save, `touch`, ...).
#[derive(Debug)]
pub struct FileCache {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hashes: HashMap::new(),
        }
    }

    /// Record the current hash of `path` without reporting a change.
    pub fn prime(&mut self, path: &Path) {
        if let Ok(hash) = compute_file_hash(self.fs.as_ref(), path) {
            self.hashes.insert(path.to_path_buf(), hash);
        }
    }

    /// Re-hash `path` and report whether its content differs from the last
    /// time it was seen. Unknown, unreadable and deleted files count as
    /// changed.
    pub fn refresh(&mut self, path: &Path) -> bool {
        match compute_file_hash(self.fs.as_ref(), path) {
            Ok(hash) => {
                let previous = self.hashes.insert(path.to_path_buf(), hash.clone());
                let changed = previous.as_deref() != Some(hash.as_str());
                if !changed {
                    debug!("content unchanged for {:?}", path);
                }
                changed
            }
            Err(err) => {
                debug!(error = %err, "cannot hash {:?}; treating as changed", path);
                self.invalidate(path);
                true
            }
        }
    }

    /// Invalidate the cached hash for a file.
    pub fn invalidate(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("invalidated cache for {:?}", path);
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
