// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A placeholder chain refers back to a node that is still being resolved.
    #[error("Cyclic reference: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("Undefined reference '{path}' (referenced from '{referrer}')")]
    UndefinedReference { path: String, referrer: String },

    #[error("Malformed placeholder at '{at}': {detail}")]
    MalformedPlaceholder { at: String, detail: String },

    #[error("Filesystem walk error at {path:?}: {reason}")]
    FilesystemWalkError { path: PathBuf, reason: String },

    #[error("Unknown task '{task}' referenced from {referrer}")]
    UnknownTaskReference { task: String, referrer: String },

    #[error("Cycle detected in pipeline aliases: {0}")]
    PipelineCycle(String),

    #[error("Task '{task}' failed: {message}")]
    TaskExecutionError { task: String, message: String },

    /// Wraps whatever stopped a pipeline with the name of the task it was running.
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<AssetpipeError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetpipeError {
    /// Shorthand for a failure reported by an executor.
    pub fn task_execution(task: impl Into<String>, message: impl Into<String>) -> Self {
        AssetpipeError::TaskExecutionError {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Name of the task this error is attributed to, if any.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            AssetpipeError::TaskFailed { task, .. }
            | AssetpipeError::TaskExecutionError { task, .. } => Some(task),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetpipeError>;
