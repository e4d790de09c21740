// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::watch::path_utils::relative_str;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle stops
/// file watching and closes the path channel.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Watch `root` recursively and forward every changed path, relative to
/// `root` with forward slashes, into `path_tx`.
///
/// Access-only events are ignored. Paths outside `root` are dropped.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    path_tx: mpsc::UnboundedSender<String>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or(root);

    let callback_root = root.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                for path in &event.paths {
                    let Some(rel) = relative_str(&callback_root, path) else {
                        continue;
                    };
                    if rel.is_empty() {
                        continue;
                    }
                    if let Err(err) = path_tx.send(rel) {
                        // Called on notify's thread; tracing may not be set up
                        // for it, so fall back to stderr.
                        eprintln!("assetpipe: failed to forward notify event: {err}");
                        return;
                    }
                }
            }
            Err(err) => {
                eprintln!("assetpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;

    info!("file watcher started on {:?}", root);
    debug!("forwarding relative paths to the debouncer");

    Ok(WatcherHandle {
        _inner: watcher,
        root,
    })
}
