use crate::CollectError;
use cluster_report_config::Node;
use std::{
    future::Future,
    path::PathBuf,
    pin::Pin,
    process::Stdio,
    time::Duration,
};
use tokio::process::Command;

pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, CollectError>> + Send + 'a>>;

/// Runs a shell command on a node and hands back its stdout.
pub trait Transport: Send + Sync {
    fn execute<'a>(&'a self, node: &'a Node, command: &'a str) -> ExecFuture<'a>;
}

/// Executes commands with `sh -c` for local nodes and through the `ssh` client otherwise.
///
/// Children are spawned with `kill_on_drop`, so dropping the returned future (on timeout or
/// cancellation) terminates the process instead of leaking it.
#[derive(Debug, Clone)]
pub struct ShellTransport {
    ssh_binary: Option<PathBuf>,
    connect_timeout: Duration,
}

impl ShellTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        let ssh_binary = which::which("ssh").ok();
        match &ssh_binary {
            Some(path) => debug!(?path, "found ssh client"),
            None => warn!("no ssh client found, only local nodes can be collected"),
        }
        Self {
            ssh_binary,
            connect_timeout,
        }
    }

    fn command_for(&self, node: &Node, command: &str) -> Result<Command, CollectError> {
        if node.is_local() {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            return Ok(cmd);
        }

        let ssh = self
            .ssh_binary
            .as_ref()
            .ok_or_else(|| CollectError::execution(format!("cannot reach {}: ssh client not found", node.host)))?;
        let mut cmd = Command::new(ssh);
        cmd.args(ssh_args(node, self.connect_timeout)).arg(command);
        Ok(cmd)
    }
}

impl Default for ShellTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// Arguments passed to `ssh` before the remote command.
fn ssh_args(node: &Node, connect_timeout: Duration) -> Vec<String> {
    let mut args = vec![
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", connect_timeout.as_secs().max(1)),
    ];
    if let Some(key) = &node.credentials.ssh_key {
        args.push("-i".to_string());
        args.push(key.display().to_string());
    }
    if let Some(port) = node.port {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    if let Some(user) = &node.credentials.username {
        args.push("-l".to_string());
        args.push(user.clone());
    }
    args.push(node.host.clone());
    args.push("--".to_string());
    args
}

impl Transport for ShellTransport {
    fn execute<'a>(&'a self, node: &'a Node, command: &'a str) -> ExecFuture<'a> {
        Box::pin(async move {
            let mut cmd = self.command_for(node, command)?;
            cmd.stdin(Stdio::null()).kill_on_drop(true);

            trace!(node = %node.name, command, "executing");
            let output = cmd
                .output()
                .await
                .map_err(|e| CollectError::execution(format!("failed to spawn command on {}: {e}", node.name)))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(CollectError::execution(format!(
                    "`{command}` on {} exited with {}: {}",
                    node.name,
                    output.status,
                    stderr.trim()
                )));
            }

            Ok(output.stdout)
        })
    }
}
