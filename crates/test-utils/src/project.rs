use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway project directory on the real filesystem.
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Write a minimal `package.json`.
    pub fn write_package(&self, name: &str, version: &str) -> PathBuf {
        self.write(
            "package.json",
            format!(r#"{{ "name": "{name}", "version": "{version}" }}"#),
        )
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}
