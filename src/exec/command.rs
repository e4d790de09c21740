// src/exec/command.rs

//! External tool runner.
//!
//! Linting, style compilation, minification and similar steps are delegated
//! to external programs through the `command` executor:
//!
//! ```toml
//! [task."less:build"]
//! executor = "command"
//! inputs = { src = "src/less/main.less" }
//! output = "build/css/app.css"
//! options = { cmd = "lessc {inputs} {output}" }
//! ```
//!
//! `{inputs}` expands to the space-separated, shell-quoted input paths
//! (relative to the project root) and `{output}` to the output path. The
//! command runs through the platform shell with the project root as its
//! working directory.

use std::process::Stdio;
use std::sync::LazyLock;

use anyhow::Context;
use regex::{Captures, Regex};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::builtin::option_error;
use crate::exec::executor::{ExecContext, ExecFuture, TaskExecutor, TaskInvocation, TaskReport};
use crate::pipeline::TaskDefinition;

static COMMAND_PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(inputs|output)\}").expect("command placeholder regex is valid"));

#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl TaskExecutor for CommandExecutor {
    fn check_options(&self, task: &TaskDefinition) -> Result<()> {
        match task.options.get("cmd") {
            Some(toml::Value::String(cmd)) if !cmd.trim().is_empty() => Ok(()),
            _ => Err(option_error(task, "command needs a non-empty `options.cmd`")),
        }
    }

    fn execute<'a>(&'a self, invocation: &'a TaskInvocation, ctx: &'a ExecContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let template = invocation
                .option_str("cmd")?
                .ok_or_else(|| invocation.fail("missing `options.cmd`"))?;
            let cmd = render_command(template, invocation);

            info!(task = %invocation.task, cmd = %cmd, "running command");

            let output = shell(&cmd)
                .current_dir(&ctx.root)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await
                .with_context(|| format!("spawning process for task '{}'", invocation.task))
                .map_err(|e| invocation.fail(format!("{e:#}")))?;

            for line in String::from_utf8_lossy(&output.stdout).lines() {
                debug!(task = %invocation.task, "stdout: {}", line);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            for line in stderr.lines() {
                if output.status.success() {
                    debug!(task = %invocation.task, "stderr: {}", line);
                } else {
                    warn!(task = %invocation.task, "stderr: {}", line);
                }
            }

            let code = output.status.code().unwrap_or(-1);
            if !output.status.success() {
                let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
                return Err(invocation.fail(match last {
                    Some(line) => format!("command exited with status {code}: {line}"),
                    None => format!("command exited with status {code}"),
                }));
            }

            let mut report = TaskReport::default().with_meta("exit_code", code.to_string());
            if let Some(out) = invocation.output_path(&ctx.root) {
                report.files_written.push(out);
            }
            Ok(report)
        })
    }
}

/// Build a shell command appropriate for the platform.
pub(crate) fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Substitute `{inputs}` and `{output}` in a command template.
pub fn render_command(template: &str, invocation: &TaskInvocation) -> String {
    let inputs: Vec<String> = invocation
        .all_inputs()
        .flat_map(|group| group.root_relative())
        .map(|p| shell_quote(&p))
        .collect();
    let output = invocation
        .output
        .as_deref()
        .map(shell_quote)
        .unwrap_or_default();

    let inputs = inputs.join(" ");

    // One pass, so substituted paths are never scanned again.
    COMMAND_PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "inputs" => inputs.clone(),
            _ => output.clone(),
        })
        .into_owned()
}

/// Quote `s` for a POSIX shell unless it only holds safe characters.
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+=,".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}
