// src/exec/backend.rs

//! Pluggable run backend abstraction.
//!
//! The watch runtime talks to a `RunBackend` instead of owning the pipeline
//! scheduler. This makes it easy to swap in a fake backend in tests while
//! production runs go through [`SchedulerBackend`].
//!
//! A backend must eventually send exactly one `RuntimeEvent::RunCompleted`
//! for every request it accepts.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::error;

use crate::engine::{RunOutcome, RunRequest, RuntimeEvent};
use crate::errors::{AssetpipeError, Result};
use crate::pipeline::PipelineScheduler;

/// Trait abstracting how a watch run is carried out.
pub trait RunBackend: Send {
    /// Start the given run. Must not wait for it to finish.
    fn start_run(
        &mut self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs the requested tasks on a shared
/// `PipelineScheduler` in a background task.
pub struct SchedulerBackend {
    scheduler: Arc<Mutex<PipelineScheduler>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl SchedulerBackend {
    pub fn new(
        scheduler: Arc<Mutex<PipelineScheduler>>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            scheduler,
            runtime_tx,
        }
    }
}

impl RunBackend for SchedulerBackend {
    fn start_run(
        &mut self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the handles so the spawned task doesn't borrow `self`.
        let scheduler = Arc::clone(&self.scheduler);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let label = format!("watch run {}", request.run_id);
                let outcome = {
                    let mut scheduler = scheduler.lock().await;
                    match scheduler.run_tasks(&label, &request.tasks).await {
                        Ok(_) => RunOutcome::Success,
                        Err(err) => failed_outcome(&err),
                    }
                };

                let event = RuntimeEvent::RunCompleted {
                    run_id: request.run_id,
                    outcome,
                };
                if let Err(err) = tx.send(event).await {
                    error!(error = %err, "failed to report run completion");
                }
            });
            Ok(())
        })
    }
}

fn failed_outcome(err: &AssetpipeError) -> RunOutcome {
    let message = match err {
        AssetpipeError::TaskFailed { source, .. } => source.to_string(),
        other => other.to_string(),
    };
    RunOutcome::Failed {
        task: err.task_name().map(str::to_string),
        message,
    }
}
