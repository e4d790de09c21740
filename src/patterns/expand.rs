// src/patterns/expand.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::errors::{AssetpipeError, Result};
use crate::fs::FileSystem;
use crate::patterns::group::{PatternExpr, PatternGroup, Polarity};

/// The files a pattern group expanded to.
///
/// `files` are `/`-separated and relative to `base`; `cwd` is the group's
/// optional sub-directory (relative to the project root) that `base` was
/// built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub base: PathBuf,
    pub cwd: String,
    pub files: Vec<String>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Full paths (`base` joined with each file).
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| self.base.join(f)).collect()
    }

    /// Paths relative to the project root, `/`-separated.
    pub fn root_relative(&self) -> Vec<String> {
        let cwd = self.cwd.trim_end_matches('/');
        self.files
            .iter()
            .map(|f| {
                if cwd.is_empty() || cwd == "." {
                    f.clone()
                } else {
                    format!("{cwd}/{f}")
                }
            })
            .collect()
    }
}

/// Expand `group` against the directory `root.join(cwd)`.
///
/// Expressions are applied left to right: an include appends its matches
/// (sorted) to the working list, skipping paths already present; an exclude
/// removes every member it matches. A path excluded and later re-included is
/// appended again at the end. Only regular files are returned.
pub fn expand(
    fs: &dyn FileSystem,
    root: &Path,
    cwd: &str,
    group: &PatternGroup,
) -> Result<Expansion> {
    let base = if cwd.is_empty() || cwd == "." {
        root.to_path_buf()
    } else {
        root.join(cwd)
    };

    let mut files: Vec<String> = Vec::new();
    let mut present: HashSet<String> = HashSet::new();

    for expr in group.exprs() {
        match expr.polarity() {
            Polarity::Include => {
                let mut matched = candidates(fs, &base, expr)?;
                matched.sort();
                trace!(pattern = expr.source(), count = matched.len(), "include");
                for path in matched {
                    if present.insert(path.clone()) {
                        files.push(path);
                    }
                }
            }
            Polarity::Exclude => {
                files.retain(|p| {
                    let keep = !expr.is_match(p);
                    if !keep {
                        present.remove(p);
                    }
                    keep
                });
            }
        }
    }

    debug!(
        base = %base.display(),
        patterns = ?group.sources(),
        count = files.len(),
        "expanded pattern group"
    );

    Ok(Expansion {
        base,
        cwd: cwd.to_string(),
        files,
    })
}

/// Files under `base` matched by a single include expression.
fn candidates(fs: &dyn FileSystem, base: &Path, expr: &PatternExpr) -> Result<Vec<String>> {
    if let Some(literal) = expr.literal_path() {
        return Ok(if fs.is_file(&base.join(literal)) {
            vec![literal.to_string()]
        } else {
            Vec::new()
        });
    }

    let prefix = expr.literal_base();
    let start = if prefix.is_empty() {
        base.to_path_buf()
    } else {
        base.join(prefix)
    };
    if !fs.is_dir(&start) {
        return Ok(Vec::new());
    }

    // Without `**` a pattern can only match a fixed number of levels below
    // its literal prefix.
    let glob_depth = expr.glob().split('/').count();
    let prefix_depth = if prefix.is_empty() {
        0
    } else {
        prefix.split('/').count()
    };
    let max_depth = if expr.glob().contains("**") {
        None
    } else {
        Some(glob_depth.saturating_sub(prefix_depth))
    };

    let mut walker = Walker {
        fs,
        expr,
        max_depth,
        ancestors: Vec::new(),
        out: Vec::new(),
    };
    walker.walk(&start, prefix, 0)?;
    Ok(walker.out)
}

struct Walker<'a> {
    fs: &'a dyn FileSystem,
    expr: &'a PatternExpr,
    max_depth: Option<usize>,
    /// Canonical paths of the directories currently being walked.
    ancestors: Vec<PathBuf>,
    out: Vec<String>,
}

impl Walker<'_> {
    fn walk(&mut self, dir: &Path, rel_dir: &str, depth: usize) -> Result<()> {
        let canonical = self
            .fs
            .canonicalize(dir)
            .map_err(|e| walk_error(dir, format!("{e:#}")))?;
        if self.ancestors.contains(&canonical) {
            return Err(walk_error(
                dir,
                format!(
                    "symlink cycle: directory resolves to its own ancestor {}",
                    canonical.display()
                ),
            ));
        }

        let mut entries = self
            .fs
            .read_dir(dir)
            .map_err(|e| walk_error(dir, format!("{e:#}")))?;
        entries.sort();

        self.ancestors.push(canonical);
        for entry in entries {
            let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let rel = if rel_dir.is_empty() {
                name
            } else {
                format!("{rel_dir}/{name}")
            };

            if self.fs.is_dir(&entry) {
                if self.max_depth.is_none_or(|max| depth + 1 < max) {
                    self.walk(&entry, &rel, depth + 1)?;
                }
            } else if self.fs.is_file(&entry) && self.expr.is_match(&rel) {
                self.out.push(rel);
            }
        }
        self.ancestors.pop();

        Ok(())
    }
}

fn walk_error(path: &Path, reason: String) -> AssetpipeError {
    AssetpipeError::FilesystemWalkError {
        path: path.to_path_buf(),
        reason,
    }
}
