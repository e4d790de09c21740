use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use assetpipe::engine::{RunId, RunOutcome, RunRequest, RuntimeEvent};
use assetpipe::errors::Result;
use assetpipe::exec::{ExecContext, ExecFuture, RunBackend, TaskExecutor, TaskInvocation, TaskReport};

/// One call seen by a [`FakeExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub task: String,
    /// Root-relative input files, in group-name then expansion order.
    pub inputs: Vec<String>,
    pub output: Option<String>,
    pub options: toml::Table,
}

/// A fake task executor that:
/// - records every invocation
/// - fails for tasks listed via [`FakeExecutor::fail_on`]
/// - optionally writes its inputs' names to the task output
/// - reports fixed metadata
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    metadata: BTreeMap<String, String>,
    write_output: bool,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a listing of the inputs to the output path on each call.
    pub fn writing_output(mut self) -> Self {
        self.write_output = true;
        self
    }

    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn fail_on(&self, task: &str) {
        self.failing.lock().unwrap().insert(task.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Task names in call order.
    pub fn executed(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.task).collect()
    }
}

impl TaskExecutor for FakeExecutor {
    fn execute<'a>(&'a self, invocation: &'a TaskInvocation, ctx: &'a ExecContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let inputs: Vec<String> = invocation
                .all_inputs()
                .flat_map(|g| g.root_relative())
                .collect();

            self.calls.lock().unwrap().push(RecordedCall {
                task: invocation.task.clone(),
                inputs: inputs.clone(),
                output: invocation.output.clone(),
                options: invocation.options.clone(),
            });

            if self.failing.lock().unwrap().contains(&invocation.task) {
                return Err(invocation.fail("fake failure"));
            }

            let mut report = TaskReport::default();
            if self.write_output {
                if let Some(out) = invocation.output_path(&ctx.root) {
                    let body = inputs.join("\n");
                    ctx.fs
                        .write(&out, body.as_bytes())
                        .map_err(|e| invocation.fail(format!("{e:#}")))?;
                    report.files_written.push(out);
                }
            }
            report.metadata = self.metadata.clone();
            Ok(report)
        })
    }
}

/// A fake run backend that:
/// - records which runs were started
/// - unless created with [`FakeRunBackend::manual`], immediately reports
///   `RunCompleted` (failed for run ids passed to `fail_run`)
pub struct FakeRunBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    started: Arc<Mutex<Vec<RunRequest>>>,
    failing: HashSet<RunId>,
    auto_complete: bool,
}

impl FakeRunBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, started: Arc<Mutex<Vec<RunRequest>>>) -> Self {
        Self {
            runtime_tx,
            started,
            failing: HashSet::new(),
            auto_complete: true,
        }
    }

    /// Never completes runs on its own; the test sends `RunCompleted`.
    pub fn manual(runtime_tx: mpsc::Sender<RuntimeEvent>, started: Arc<Mutex<Vec<RunRequest>>>) -> Self {
        Self {
            auto_complete: false,
            ..Self::new(runtime_tx, started)
        }
    }

    pub fn fail_run(mut self, run_id: RunId) -> Self {
        self.failing.insert(run_id);
        self
    }
}

impl RunBackend for FakeRunBackend {
    fn start_run(
        &mut self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let started = Arc::clone(&self.started);
        let auto_complete = self.auto_complete;
        let outcome = if self.failing.contains(&request.run_id) {
            RunOutcome::Failed {
                task: request.tasks.first().cloned(),
                message: "fake failure".to_string(),
            }
        } else {
            RunOutcome::Success
        };

        Box::pin(async move {
            let run_id = request.run_id;
            started.lock().unwrap().push(request);

            if auto_complete {
                tx.send(RuntimeEvent::RunCompleted { run_id, outcome })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
