// src/exec/executor.rs

//! Executor contract.
//!
//! Every task names an executor id. At run time the scheduler hands the
//! executor a fully rendered [`TaskInvocation`] (expanded inputs, output
//! path, options) and an [`ExecContext`], and the executor returns a
//! [`TaskReport`] whose metadata is written back under `run.<task>.*`.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::{AssetpipeError, Result};
use crate::fs::FileSystem;
use crate::patterns::Expansion;
use crate::pipeline::TaskDefinition;
use crate::template::ConfigTree;
use crate::types::TaskName;

/// Everything an executor needs to know about one task execution.
#[derive(Debug, Clone)]
pub struct TaskInvocation {
    pub task: TaskName,
    /// Expanded input groups, keyed by group name.
    pub inputs: BTreeMap<String, Expansion>,
    /// Output path relative to the project root, if the task has one.
    pub output: Option<String>,
    pub options: toml::Table,
}

impl TaskInvocation {
    /// Shorthand for an execution error attributed to this task.
    pub fn fail(&self, message: impl Into<String>) -> AssetpipeError {
        AssetpipeError::task_execution(&self.task, message)
    }

    pub fn input(&self, name: &str) -> Option<&Expansion> {
        self.inputs.get(name)
    }

    /// Every input group in name order.
    pub fn all_inputs(&self) -> impl Iterator<Item = &Expansion> {
        self.inputs.values()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.values().map(Expansion::len).sum()
    }

    pub fn output_path(&self, root: &Path) -> Option<PathBuf> {
        self.output.as_ref().map(|o| root.join(o))
    }

    pub fn require_output(&self, root: &Path) -> Result<PathBuf> {
        self.output_path(root)
            .ok_or_else(|| self.fail("task has no `output`"))
    }

    pub fn option_str(&self, key: &str) -> Result<Option<&str>> {
        match self.options.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.fail(format!(
                "option `{key}` must be a string, got {}",
                other.type_str()
            ))),
        }
    }

    pub fn option_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.options.get(key) {
            None => Ok(None),
            Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
            Some(other) => Err(self.fail(format!(
                "option `{key}` must be a boolean, got {}",
                other.type_str()
            ))),
        }
    }

    /// A string or list-of-strings option.
    pub fn option_list(&self, key: &str) -> Result<Vec<String>> {
        match self.options.get(key) {
            None => Ok(Vec::new()),
            Some(toml::Value::String(s)) => Ok(vec![s.clone()]),
            Some(toml::Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        self.fail(format!("option `{key}` must only contain strings"))
                    })
                })
                .collect(),
            Some(other) => Err(self.fail(format!(
                "option `{key}` must be a string or a list of strings, got {}",
                other.type_str()
            ))),
        }
    }
}

/// Shared, read-only environment for executors.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub tree: Arc<ConfigTree>,
    pub config_path: PathBuf,
}

/// What an executor hands back on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Written back to the config scope as `run.<task>.<key>`.
    pub metadata: BTreeMap<String, String>,
    pub files_written: Vec<PathBuf>,
}

impl TaskReport {
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + 'a>>;

/// A unit of work a task can be bound to.
///
/// Implementations must be idempotent: running the same invocation twice
/// leaves the same files behind (outputs are overwritten, never appended).
pub trait TaskExecutor: Send + Sync + Debug {
    /// Static checks on a task definition, run once at startup.
    fn check_options(&self, task: &TaskDefinition) -> Result<()> {
        let _ = task;
        Ok(())
    }

    fn execute<'a>(&'a self, invocation: &'a TaskInvocation, ctx: &'a ExecContext)
        -> ExecFuture<'a>;
}

/// Executors by id.
#[derive(Debug, Clone, Default)]
pub struct ExecutorSet {
    executors: BTreeMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in executors: `clean`, `copy`, `concat`, `index`, `command`
    /// and `validate_config`.
    pub fn builtin() -> Self {
        let mut set = Self::new();
        set.register("clean", crate::exec::builtin::CleanExecutor);
        set.register("copy", crate::exec::builtin::CopyExecutor);
        set.register("concat", crate::exec::builtin::ConcatExecutor);
        set.register("validate_config", crate::exec::builtin::ValidateConfigExecutor);
        set.register("command", crate::exec::command::CommandExecutor);
        set.register("index", crate::render::IndexExecutor);
        set
    }

    /// Add or replace an executor.
    pub fn register(&mut self, id: impl Into<String>, executor: impl TaskExecutor + 'static) {
        self.executors.insert(id.into(), Arc::new(executor));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.executors.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.executors.keys().map(String::as_str)
    }
}
