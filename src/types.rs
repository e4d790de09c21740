// src/types.rs

use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Check performed after a task's executor reports success.
///
/// - `OutputExists`: the task's resolved output path must exist once the
///   executor returns, otherwise the run fails with a `TaskExecutionError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostCondition {
    OutputExists,
}

/// Why a set of tasks is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Explicit CLI invocation (`build`, `compile`, ...).
    Manual,
    /// Incremental re-run caused by a filesystem change.
    FileWatch,
}
