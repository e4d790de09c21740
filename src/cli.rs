// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Template-driven front-end asset build pipelines with incremental watch.",
    long_about = None
)]
pub struct CliArgs {
    /// What to run. Defaults to the `default` pipeline.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Assetpipe.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value = "Assetpipe.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load, resolve and validate the config, print the pipelines, but don't
    /// run any task.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The subcommand, with a missing one meaning `default`.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the `build` pipeline once.
    Build,
    /// Run the `compile` pipeline once.
    Compile,
    /// Run `build`, start the preview server, then rebuild on changes.
    Watch,
    /// Run the `default` pipeline (`build` then `compile`).
    Default,
    /// Run any pipeline or task by name.
    Run {
        /// Pipeline, task, or `prefix` for every `prefix:*` task.
        name: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
