// src/watch/debounce.rs

//! Coalesces bursts of change events into single batches.
//!
//! Saving a file often produces several raw notify events (write, chmod,
//! rename from a temp file, ...). The debouncer collects changed paths until
//! no new event has arrived for the configured window and only then emits
//! one [`RuntimeEvent::FilesChanged`].

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;

/// Drops paths whose content hash did not change since they were last seen.
#[derive(Debug)]
pub struct HashFilter {
    root: PathBuf,
    cache: FileCache,
}

impl HashFilter {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            cache: FileCache::new(fs),
        }
    }

    /// Record current hashes so the first real edit is compared against them.
    pub fn prime<'a>(&mut self, paths: impl IntoIterator<Item = &'a str>) {
        for p in paths {
            self.cache.prime(&self.root.join(p));
        }
    }

    pub fn retain_changed(&mut self, paths: Vec<String>) -> Vec<String> {
        paths
            .into_iter()
            .filter(|p| {
                let changed = self.cache.refresh(&self.root.join(p));
                if !changed {
                    info!(path = %p, "content unchanged; ignoring change event");
                }
                changed
            })
            .collect()
    }
}

/// Wait for the next batch: the first path blocks, later ones are collected
/// until `window` passes without a new one. `None` once the channel is
/// closed and drained.
pub async fn next_batch(
    rx: &mut mpsc::UnboundedReceiver<String>,
    window: Duration,
) -> Option<Vec<String>> {
    let first = rx.recv().await?;
    let mut batch = BTreeSet::new();
    batch.insert(first);

    loop {
        match tokio::time::timeout(window, rx.recv()).await {
            Ok(Some(path)) => {
                batch.insert(path);
            }
            // Channel closed or quiet window elapsed.
            Ok(None) | Err(_) => break,
        }
    }

    Some(batch.into_iter().collect())
}

/// Spawn the debounce stage between the watcher and the runtime.
pub fn spawn_debouncer(
    mut rx: mpsc::UnboundedReceiver<String>,
    window: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut filter: Option<HashFilter>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(batch) = next_batch(&mut rx, window).await {
            let paths = match filter.as_mut() {
                Some(f) => f.retain_changed(batch),
                None => batch,
            };
            if paths.is_empty() {
                continue;
            }

            debug!(?paths, "debounced change batch");
            if runtime_tx
                .send(RuntimeEvent::FilesChanged { paths })
                .await
                .is_err()
            {
                debug!("runtime channel closed; stopping debouncer");
                return;
            }
        }
        debug!("watch channel closed; stopping debouncer");
    })
}
