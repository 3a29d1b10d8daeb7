use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::ClusterClient;
use super::error::ClusterError;
use super::types::{PodList, PodPhase};

/// Talks to the cluster by running a `kubectl`-compatible command line.
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: String,
    prefix_args: Vec<String>,
}

impl Kubectl {
    /// Build from a command prefix such as `microk8s kubectl`, split on whitespace.
    /// Returns `None` for a blank command.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            prefix_args: words.collect(),
        })
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.prefix_args.iter().map(String::as_str))
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the tool with `args`, optionally feeding `input` on stdin, and return stdout.
    /// Anything the tool prints on stderr is logged.
    async fn run(&self, input: Option<&str>, args: &[&str]) -> Result<Vec<u8>, ClusterError> {
        let command = self.describe(args);
        debug!(%command, "running cluster command");

        let spawn_err = |source: std::io::Error| ClusterError::Spawn {
            command: command.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.prefix_args)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            // A tool that exits without reading stdin reports through its exit status.
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(spawn_err(e));
                }
            }
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            warn!(%command, "{stderr}");
        }
        if !output.status.success() {
            return Err(ClusterError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr,
            });
        }
        Ok(output.stdout)
    }
}

impl ClusterClient for Kubectl {
    async fn list_pods(&self) -> Result<Vec<PodPhase>, ClusterError> {
        let stdout = self.run(None, &["get", "pods", "-o", "json"]).await?;
        let list: PodList =
            serde_json::from_slice(&stdout).map_err(|e| ClusterError::Decode(e.to_string()))?;
        Ok(list.phases())
    }

    async fn apply(&self, manifest: &str) -> Result<(), ClusterError> {
        self.run(Some(manifest), &["apply", "-f", "-"]).await?;
        Ok(())
    }

    async fn logs(&self, name: &str) -> Result<Vec<u8>, ClusterError> {
        self.run(None, &["logs", &format!("pod/{name}")]).await
    }

    async fn delete(&self, name: &str) -> Result<(), ClusterError> {
        self.run(None, &["delete", &format!("pod/{name}")]).await?;
        Ok(())
    }
}
