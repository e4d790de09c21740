// src/exec/builtin.rs

//! File-level executors that need no external tools.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{AssetpipeError, Result};
use crate::exec::executor::{ExecContext, ExecFuture, TaskExecutor, TaskInvocation, TaskReport};
use crate::pipeline::TaskDefinition;
use crate::template::has_placeholders;
use crate::watch::hash::hash_bytes;

/// Startup-time option error for `task`.
pub(crate) fn option_error(task: &TaskDefinition, message: impl std::fmt::Display) -> AssetpipeError {
    AssetpipeError::ConfigError(format!("task '{}': {message}", task.name))
}

pub(crate) fn require_output(task: &TaskDefinition) -> Result<()> {
    if task.output.is_none() {
        return Err(option_error(
            task,
            format!("executor '{}' needs an `output`", task.executor),
        ));
    }
    Ok(())
}

/// True for a non-empty relative path that stays inside the project root.
fn is_contained(path: &str) -> bool {
    let p = Path::new(path);
    !path.trim().is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && p.components().any(|c| matches!(c, Component::Normal(_)))
}

/// Removes build directories. Option `paths` lists directories or files
/// relative to the project root; missing paths are fine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanExecutor;

impl TaskExecutor for CleanExecutor {
    fn check_options(&self, task: &TaskDefinition) -> Result<()> {
        let paths = match task.options.get("paths") {
            Some(toml::Value::Array(items)) => items,
            Some(toml::Value::String(_)) => return Ok(()),
            _ => return Err(option_error(task, "clean needs `options.paths`")),
        };
        for p in paths {
            let Some(p) = p.as_str() else {
                return Err(option_error(task, "`options.paths` must only contain strings"));
            };
            if !has_placeholders(p) && !is_contained(p) {
                return Err(option_error(
                    task,
                    format!("refusing to clean {p:?}: path must stay inside the project root"),
                ));
            }
        }
        Ok(())
    }

    fn execute<'a>(&'a self, invocation: &'a TaskInvocation, ctx: &'a ExecContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let mut removed = 0usize;
            for path in invocation.option_list("paths")? {
                if !is_contained(&path) {
                    return Err(invocation.fail(format!(
                        "refusing to clean {path:?}: path must stay inside the project root"
                    )));
                }
                let full = ctx.root.join(&path);
                if ctx.fs.exists(&full) {
                    removed += 1;
                }
                ctx.fs
                    .remove_all(&full)
                    .map_err(|e| invocation.fail(format!("{e:#}")))?;
                debug!(task = %invocation.task, path = %path, "cleaned");
            }
            Ok(TaskReport::default().with_meta("removed", removed.to_string()))
        })
    }
}

/// Copies every input file into the `output` directory, keeping each
/// file's path relative to its group's `cwd` unless `flatten = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyExecutor;

impl TaskExecutor for CopyExecutor {
    fn check_options(&self, task: &TaskDefinition) -> Result<()> {
        require_output(task)?;
        match task.options.get("flatten") {
            None | Some(toml::Value::Boolean(_)) => Ok(()),
            Some(_) => Err(option_error(task, "`options.flatten` must be a boolean")),
        }
    }

    fn execute<'a>(&'a self, invocation: &'a TaskInvocation, ctx: &'a ExecContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let dest_dir = invocation.require_output(&ctx.root)?;
            let flatten = invocation.option_bool("flatten")?.unwrap_or(false);

            let mut report = TaskReport::default();
            for group in invocation.all_inputs() {
                for (rel, src) in group.files.iter().zip(group.paths()) {
                    let target: PathBuf = if flatten {
                        match Path::new(rel).file_name() {
                            Some(name) => dest_dir.join(name),
                            None => continue,
                        }
                    } else {
                        dest_dir.join(rel)
                    };
                    let bytes = ctx
                        .fs
                        .read(&src)
                        .map_err(|e| invocation.fail(format!("{e:#}")))?;
                    ctx.fs
                        .write(&target, &bytes)
                        .map_err(|e| invocation.fail(format!("{e:#}")))?;
                    report.files_written.push(target);
                }
            }

            let count = report.files_written.len();
            debug!(task = %invocation.task, count, "copied files");
            Ok(report.with_meta("count", count.to_string()))
        })
    }
}

/// Concatenates every input file, in expansion order, into `output`.
///
/// Options: `banner` (prepended once), `separator` (between files, default
/// a newline). Reports the output's `hash` (blake3) and `bytes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatExecutor;

impl TaskExecutor for ConcatExecutor {
    fn check_options(&self, task: &TaskDefinition) -> Result<()> {
        require_output(task)?;
        for key in ["banner", "separator"] {
            if let Some(v) = task.options.get(key) {
                if !v.is_str() {
                    return Err(option_error(task, format!("`options.{key}` must be a string")));
                }
            }
        }
        Ok(())
    }

    fn execute<'a>(&'a self, invocation: &'a TaskInvocation, ctx: &'a ExecContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let output = invocation.require_output(&ctx.root)?;
            let banner = invocation.option_str("banner")?.unwrap_or_default();
            let separator = invocation.option_str("separator")?.unwrap_or("\n");

            // Read everything first so a missing input leaves the old output
            // untouched.
            let mut parts = Vec::new();
            for group in invocation.all_inputs() {
                for path in group.paths() {
                    let bytes = ctx
                        .fs
                        .read(&path)
                        .map_err(|e| invocation.fail(format!("{e:#}")))?;
                    parts.push(bytes);
                }
            }

            let mut out: Vec<u8> = banner.as_bytes().to_vec();
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(separator.as_bytes());
                }
                out.extend_from_slice(part);
            }

            ctx.fs
                .write(&output, &out)
                .map_err(|e| invocation.fail(format!("{e:#}")))?;

            let hash = hash_bytes(&out);
            debug!(task = %invocation.task, files = parts.len(), hash = %hash, "concatenated");
            Ok(TaskReport {
                files_written: vec![output],
                ..TaskReport::default()
            }
            .with_meta("hash", hash)
            .with_meta("bytes", out.len().to_string()))
        })
    }
}

/// Reloads and re-validates the config file. Bound to the implicit
/// `config:validate` task that runs when the config file itself changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateConfigExecutor;

impl TaskExecutor for ValidateConfigExecutor {
    fn execute<'a>(&'a self, invocation: &'a TaskInvocation, ctx: &'a ExecContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let cfg = crate::config::load_and_validate(&ctx.config_path)
                .map_err(|e| invocation.fail(format!("config is invalid: {e}")))?;
            info!(
                path = ?ctx.config_path,
                tasks = cfg.task.len(),
                "config file is valid; restart to apply changes"
            );
            Ok(TaskReport::default().with_meta("tasks", cfg.task.len().to_string()))
        })
    }
}
