// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::engine::queue::TriggerQueue;
use crate::engine::{RunId, RunOutcome, RunRequest, RuntimeOptions, TaskName, TriggerReason};
use crate::watch::WatchRules;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Hand these tasks to the run backend.
    StartRun(RunRequest),
    /// A livereload-enabled run succeeded.
    NotifyReload { run_id: RunId, tasks: Vec<TaskName> },
    /// Request that the runtime exits.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn keep(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Run bookkeeping: at most one run is in flight.
#[derive(Debug, Default)]
pub struct RunState {
    pub active: Option<RunRequest>,
    pub next_run_id: RunId,
    pub shutting_down: bool,
}

impl RunState {
    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Record a new active run and return the command that starts it.
    fn start(&mut self, tasks: Vec<TaskName>, livereload: bool, reason: TriggerReason) -> CoreCommand {
        self.next_run_id += 1;
        let request = RunRequest {
            run_id: self.next_run_id,
            tasks,
            livereload,
            reason,
        };
        self.active = Some(request.clone());
        CoreCommand::StartRun(request)
    }
}

/// Handle a debounced batch of changed paths.
///
/// - If no run is active, the matching tasks start a new run immediately.
/// - Otherwise they are merged into the pending batch and start once the
///   current run completes.
pub fn handle_files_changed(
    rules: &WatchRules,
    state: &mut RunState,
    queue: &mut TriggerQueue,
    paths: Vec<String>,
) -> CoreStep {
    if state.shutting_down {
        return CoreStep::keep(Vec::new());
    }

    let Some(dispatch) = rules.dispatch(&paths) else {
        return CoreStep::keep(Vec::new());
    };

    if !state.is_idle() {
        queue.record(dispatch);
        return CoreStep::keep(Vec::new());
    }

    let command = state.start(dispatch.tasks, dispatch.livereload, TriggerReason::FileWatch);
    CoreStep::keep(vec![command])
}

/// Handle completion of the active run.
pub fn handle_run_completed(
    rules: &WatchRules,
    state: &mut RunState,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    run_id: RunId,
    outcome: RunOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let finished = match state.active.take() {
        Some(active) if active.run_id == run_id => active,
        other => {
            // Stale or unknown completion; keep whatever is active.
            state.active = other;
            return CoreStep::keep(commands);
        }
    };

    if outcome == RunOutcome::Success && finished.livereload {
        commands.push(CoreCommand::NotifyReload {
            run_id,
            tasks: finished.tasks,
        });
    }

    if state.shutting_down {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    if let Some((tasks, livereload)) = queue.drain() {
        let tasks = rules.sort_tasks(tasks);
        commands.push(state.start(tasks, livereload, TriggerReason::FileWatch));
        return CoreStep::keep(commands);
    }

    if options.exit_when_idle {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    CoreStep::keep(commands)
}

/// Handle a shutdown request: stop accepting changes, drop anything queued
/// and let an in-flight run finish before exiting.
pub fn handle_shutdown(state: &mut RunState, queue: &mut TriggerQueue) -> CoreStep {
    state.shutting_down = true;
    queue.clear();

    if state.is_idle() {
        CoreStep {
            commands: vec![CoreCommand::RequestExit],
            keep_running: false,
        }
    } else {
        CoreStep::keep(Vec::new())
    }
}
