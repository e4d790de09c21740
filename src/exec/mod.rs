// src/exec/mod.rs

//! Execution layer.
//!
//! - [`executor`] defines the [`TaskExecutor`] contract and [`ExecutorSet`].
//! - [`builtin`] holds the file-level executors (`clean`, `copy`, `concat`,
//!   `validate_config`).
//! - [`command`] delegates to external tools through the platform shell.
//! - [`server`] starts the optional preview server for `watch`.
//! - [`backend`] provides the [`RunBackend`] trait the watch runtime uses to
//!   start runs, and [`SchedulerBackend`], the production implementation
//!   that drives a [`crate::pipeline::PipelineScheduler`]. Tests swap in a
//!   fake backend.

pub mod backend;
pub mod builtin;
pub mod command;
pub mod executor;
pub mod server;

pub use backend::{RunBackend, SchedulerBackend};
pub use executor::{ExecContext, ExecFuture, ExecutorSet, TaskExecutor, TaskInvocation, TaskReport};
