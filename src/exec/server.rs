// src/exec/server.rs

//! Optional preview server started by `watch`.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::config::ServerSection;
use crate::exec::command::shell;

/// Running preview server. The child is killed when this is dropped.
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
}

impl ServerHandle {
    /// Kill the server and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "failed to stop preview server");
        } else {
            info!("preview server stopped");
        }
    }
}

/// Start `[server].cmd` in the background, logging its output.
pub fn spawn_server(server: &ServerSection, root: &Path) -> Result<ServerHandle> {
    let cwd = match &server.cwd {
        Some(dir) => root.join(dir),
        None => root.to_path_buf(),
    };

    let mut child = shell(&server.cmd)
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning preview server `{}`", server.cmd))?;

    info!(cmd = %server.cmd, cwd = ?cwd, "preview server started");

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(target: "assetpipe::server", "{}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "assetpipe::server", "stderr: {}", line);
            }
        });
    }

    Ok(ServerHandle { child })
}
