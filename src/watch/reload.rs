// src/watch/reload.rs

use tracing::info;

use crate::types::TaskName;

/// Receives "reload the browser" notifications after successful watch runs.
pub trait ReloadNotifier: Send {
    fn notify(&mut self, tasks: &[TaskName]);
}

/// Default notifier: logs the reload.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReloadNotifier;

impl ReloadNotifier for LogReloadNotifier {
    fn notify(&mut self, tasks: &[TaskName]) {
        info!(?tasks, "livereload");
    }
}
