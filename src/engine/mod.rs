// src/engine/mod.rs

//! Watch-session engine.
//!
//! This module ties together:
//! - the watch rules (which tasks a batch of changed paths maps to)
//! - the trigger queue (what happens when changes arrive while a run is
//!   active)
//! - the main runtime event loop that reacts to:
//!   - debounced file-change batches
//!   - run completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

pub use crate::types::{TaskName, TriggerReason};

/// Identifier of one incremental run within a watch session.
pub type RunId = u64;

/// Outcome of a run as reported back to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed {
        task: Option<TaskName>,
        message: String,
    },
}

/// A run the core wants the backend to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub run_id: RunId,
    pub tasks: Vec<TaskName>,
    /// Notify the reload listener if the run succeeds.
    pub livereload: bool,
    pub reason: TriggerReason,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once no run is active and nothing is
    /// queued (used by tests to drive a finite session).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the debouncer, the run backend and
/// the signal handler.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A debounced batch of changed paths, relative to the project root.
    FilesChanged { paths: Vec<String> },
    /// A run started by the backend finished.
    RunCompleted { run_id: RunId, outcome: RunOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
