// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::TaskName;
use crate::watch::Dispatch;

/// Changes that arrive while a run is in progress.
///
/// Everything recorded while a run is active is merged into one pending
/// batch: the union of tasks, with livereload requested if any recorded
/// dispatch asked for it. The next run starts from that batch once the
/// current run completes.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    tasks: BTreeSet<TaskName>,
    livereload: bool,
    /// Number of dispatches merged into the pending batch.
    merged: usize,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Merge a dispatch into the pending batch.
    pub fn record(&mut self, dispatch: Dispatch) {
        self.merged += 1;
        self.livereload |= dispatch.livereload;
        let before = self.tasks.len();
        self.tasks.extend(dispatch.tasks);
        debug!(
            added = self.tasks.len() - before,
            pending = self.tasks.len(),
            merged = self.merged,
            "queued triggers while a run is active"
        );
    }

    /// Take the pending batch, leaving the queue empty. The task order is
    /// unspecified; callers re-sort it.
    pub fn drain(&mut self) -> Option<(Vec<TaskName>, bool)> {
        if self.tasks.is_empty() {
            return None;
        }
        let tasks = std::mem::take(&mut self.tasks).into_iter().collect();
        let livereload = std::mem::take(&mut self.livereload);
        self.merged = 0;
        Some((tasks, livereload))
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.livereload = false;
        self.merged = 0;
    }
}
