// src/pipeline/scheduler.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::config::ConfigFile;
use crate::errors::{AssetpipeError, Result};
use crate::exec::{ExecContext, ExecutorSet, TaskInvocation, TaskReport};
use crate::fs::FileSystem;
use crate::patterns::{expand, PatternGroup};
use crate::pipeline::metadata::RunMetadata;
use crate::pipeline::registry::{TaskDefinition, TaskRegistry};
use crate::template::{render_deferred, render_text, ConfigNode};
use crate::types::{PostCondition, TaskName};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub label: String,
    pub tasks: Vec<TaskName>,
    pub elapsed: Duration,
}

/// Executes pipelines: one task at a time, in declared order, stopping at
/// the first failure.
///
/// Input patterns are re-expanded for every task execution; nothing about
/// the filesystem is cached between tasks or between runs.
#[derive(Debug)]
pub struct PipelineScheduler {
    registry: TaskRegistry,
    executors: ExecutorSet,
    ctx: ExecContext,
    metadata: RunMetadata,
}

impl PipelineScheduler {
    /// Fails if a task names an unknown executor or has invalid options.
    pub fn new(registry: TaskRegistry, executors: ExecutorSet, ctx: ExecContext) -> Result<Self> {
        registry.check_executors(&executors)?;
        Ok(Self {
            registry,
            executors,
            ctx,
            metadata: RunMetadata::new(),
        })
    }

    pub fn from_config(
        cfg: &ConfigFile,
        executors: ExecutorSet,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let registry = TaskRegistry::from_config(cfg)?;
        let ctx = ExecContext {
            root: cfg.root().to_path_buf(),
            fs,
            tree: Arc::clone(cfg.tree()),
            config_path: cfg.source.path.clone(),
        };
        Self::new(registry, executors, ctx)
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn context(&self) -> &ExecContext {
        &self.ctx
    }

    /// Run a named pipeline.
    pub async fn run_pipeline(&mut self, name: &str) -> Result<RunSummary> {
        let tasks = self
            .registry
            .pipeline(name)
            .map(|p| p.tasks.clone())
            .ok_or_else(|| AssetpipeError::UnknownTaskReference {
                task: name.to_string(),
                referrer: "pipeline request".to_string(),
            })?;
        self.run_tasks(name, &tasks).await
    }

    /// Run a pipeline, a single task or a multi-target prefix.
    pub async fn run_target(&mut self, name: &str) -> Result<RunSummary> {
        let tasks = self.registry.resolve(name)?;
        self.run_tasks(name, &tasks).await
    }

    /// Run an explicit list of tasks in the given order.
    pub async fn run_tasks(&mut self, label: &str, tasks: &[TaskName]) -> Result<RunSummary> {
        let started = Instant::now();
        info!(run = %label, tasks = ?tasks, "starting run");

        for (index, name) in tasks.iter().enumerate() {
            debug!(run = %label, task = %name, step = index + 1, total = tasks.len(), "running task");
            let task_started = Instant::now();

            match self.run_task(name).await {
                Ok(report) => {
                    info!(
                        run = %label,
                        task = %name,
                        files = report.files_written.len(),
                        elapsed_ms = task_started.elapsed().as_millis() as u64,
                        "task finished"
                    );
                }
                Err(err) => {
                    error!(run = %label, task = %name, error = %err, "task failed; stopping run");
                    return Err(AssetpipeError::TaskFailed {
                        task: name.clone(),
                        source: Box::new(err),
                    });
                }
            }
        }

        let elapsed = started.elapsed();
        info!(run = %label, elapsed_ms = elapsed.as_millis() as u64, "run finished");
        Ok(RunSummary {
            label: label.to_string(),
            tasks: tasks.to_vec(),
            elapsed,
        })
    }

    async fn run_task(&mut self, name: &str) -> Result<TaskReport> {
        let def = self
            .registry
            .task(name)
            .cloned()
            .ok_or_else(|| AssetpipeError::UnknownTaskReference {
                task: name.to_string(),
                referrer: "run request".to_string(),
            })?;
        let executor = self.executors.get(&def.executor).ok_or_else(|| {
            AssetpipeError::ConfigError(format!(
                "task '{name}' uses unknown executor '{}'",
                def.executor
            ))
        })?;

        let invocation = self.prepare(&def)?;
        if def.require_inputs && invocation.input_count() == 0 {
            return Err(invocation.fail("inputs matched no files"));
        }

        let mut report = executor.execute(&invocation, &self.ctx).await?;

        if def.post_condition == Some(PostCondition::OutputExists) {
            let exists = invocation
                .output_path(&self.ctx.root)
                .is_some_and(|p| self.ctx.fs.exists(&p));
            if !exists {
                return Err(invocation.fail(format!(
                    "post-condition failed: output {:?} does not exist",
                    invocation.output.as_deref().unwrap_or_default()
                )));
            }
        }

        if let Some(output) = &invocation.output {
            report
                .metadata
                .entry("output".to_string())
                .or_insert_with(|| output.clone());
        }
        self.metadata.record(name, &report);
        Ok(report)
    }

    /// Render run-time placeholders and expand inputs for one execution.
    fn prepare(&self, def: &TaskDefinition) -> Result<TaskInvocation> {
        let at = format!("task.{}", def.name);

        let output = def
            .output
            .as_deref()
            .map(|o| render_text(o, &format!("{at}.output"), &self.metadata))
            .transpose()?;

        let mut inputs = std::collections::BTreeMap::new();
        for group_def in &def.inputs {
            let input_at = format!("{at}.inputs.{}", group_def.name);
            let cwd = render_text(&group_def.cwd, &input_at, &self.metadata)?;
            let patterns = group_def
                .patterns
                .iter()
                .map(|p| render_text(p, &input_at, &self.metadata))
                .collect::<Result<Vec<_>>>()?;
            let group = PatternGroup::new(&patterns).map_err(|e| {
                AssetpipeError::ConfigError(format!("{input_at}: {e:#}"))
            })?;
            let expansion = expand(self.ctx.fs.as_ref(), &self.ctx.root, &cwd, &group)?;
            inputs.insert(group_def.name.clone(), expansion);
        }

        let options = match render_deferred(
            &ConfigNode::from_toml(toml::Value::Table(def.options.clone())),
            &format!("{at}.options"),
            &self.metadata,
        )?
        .to_toml()
        {
            toml::Value::Table(t) => t,
            _ => toml::Table::new(),
        };

        Ok(TaskInvocation {
            task: def.name.clone(),
            inputs,
            output,
            options,
        })
    }
}
