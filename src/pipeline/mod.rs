// src/pipeline/mod.rs

//! Task registry and pipeline execution.
//!
//! - [`registry`] turns validated task sections into [`TaskDefinition`]s and
//!   holds the flattened pipelines.
//! - [`graph`] checks and flattens pipeline aliases.
//! - [`scheduler`] runs pipelines sequentially.
//! - [`metadata`] stores values executors write back for `run.*` lookups.

pub mod graph;
pub mod metadata;
pub mod registry;
pub mod scheduler;

pub use graph::PipelineGraph;
pub use metadata::RunMetadata;
pub use registry::{InputSpec, Pipeline, TaskDefinition, TaskRegistry};
pub use scheduler::{PipelineScheduler, RunSummary};
