// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::RunBackend;
use crate::watch::ReloadNotifier;

use super::core::CoreRuntime;
use super::{CoreCommand, RunOutcome, RuntimeEvent};

/// Reacts to `RuntimeEvent`s by feeding them to the core and carrying out
/// the commands it returns.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// watch-session semantics. Runs are handed to a `RunBackend`; reloads go
/// to a `ReloadNotifier`.
pub struct Runtime<B: RunBackend, N: ReloadNotifier> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
    notifier: N,
}

impl<B: RunBackend, N: ReloadNotifier> fmt::Debug for Runtime<B, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: RunBackend, N: ReloadNotifier> Runtime<B, N> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: B,
        notifier: N,
    ) -> Self {
        Self {
            core,
            event_rx,
            backend,
            notifier,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes the commands returned by the core.
    pub async fn run(mut self) -> Result<()> {
        info!("watch session started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");
            log_event(&event);

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("watch session ended");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartRun(request) => {
                info!(
                    run_id = request.run_id,
                    tasks = ?request.tasks,
                    livereload = request.livereload,
                    "starting run"
                );
                self.backend.start_run(request).await?;
            }
            CoreCommand::NotifyReload { run_id, tasks } => {
                debug!(run_id, "sending reload notification");
                self.notifier.notify(&tasks);
            }
            CoreCommand::RequestExit => {
                // keep_running=false already ends the loop.
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }
}

fn log_event(event: &RuntimeEvent) {
    match event {
        RuntimeEvent::FilesChanged { paths } => info!(count = paths.len(), ?paths, "files changed"),
        RuntimeEvent::RunCompleted {
            run_id,
            outcome: RunOutcome::Success,
        } => info!(run_id, "run completed"),
        RuntimeEvent::RunCompleted {
            run_id,
            outcome: RunOutcome::Failed { task, message },
        } => warn!(run_id, task = ?task, %message, "run failed; waiting for further changes"),
        RuntimeEvent::ShutdownRequested => info!("shutdown requested"),
    }
}
