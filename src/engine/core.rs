// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - handing runs to the run backend
//! - sending reload notifications
//!
//! The core has no Tokio types, channels, filesystem or processes, so it can
//! be tested by feeding it events directly.

use crate::engine::event_handlers::{
    handle_files_changed, handle_run_completed, handle_shutdown, CoreStep, RunState,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RunRequest, RuntimeEvent, RuntimeOptions};
use crate::watch::WatchRules;

#[derive(Debug)]
pub struct CoreRuntime {
    rules: WatchRules,
    queue: TriggerQueue,
    state: RunState,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(rules: WatchRules, options: RuntimeOptions) -> Self {
        Self {
            rules,
            queue: TriggerQueue::new(),
            state: RunState::default(),
            options,
        }
    }

    /// True when no run is in flight.
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn active_run(&self) -> Option<&RunRequest> {
        self.state.active.as_ref()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.shutting_down
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::FilesChanged { paths } => {
                handle_files_changed(&self.rules, &mut self.state, &mut self.queue, paths)
            }
            RuntimeEvent::RunCompleted { run_id, outcome } => handle_run_completed(
                &self.rules,
                &mut self.state,
                &mut self.queue,
                &self.options,
                run_id,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.state, &mut self.queue),
        }
    }
}
