//! Durable archive of finished jobs.
//!
//! A finished job leaves `<dir>/<name>.log` (succeeded) or `<dir>/<name>.err`
//! (failed) behind. Those files are the only state that survives a restart,
//! so their presence alone marks a job as terminal.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cluster::ClusterClient;
use crate::error::{QupodsError, Result};
use crate::state_machine::{Phase, RetryConfig};

const SUCCESS_EXT: &str = "log";
const FAILURE_EXT: &str = "err";

/// Fetches logs of finished jobs into the archive directory and removes the jobs.
#[derive(Debug, Clone)]
pub struct LogArchiver {
    dir: PathBuf,
    delete_retry: RetryConfig,
}

impl LogArchiver {
    /// Use `dir` as the archive, creating it if needed. An existing non-directory is rejected.
    pub async fn open(dir: impl Into<PathBuf>, delete_retry: RetryConfig) -> Result<Self> {
        let dir = dir.into();
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(QupodsError::Config(format!(
                    "not a directory: {}",
                    dir.display()
                )));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| QupodsError::io(&dir, e))?;
                info!(dir = %dir.display(), "created archive directory");
            }
            Err(e) => return Err(QupodsError::io(&dir, e)),
        }
        Ok(Self { dir, delete_retry })
    }

    #[cfg(test)]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Archive file for a job that ended in `phase`; `None` for non-terminal phases.
    pub fn record_path(&self, name: &str, phase: Phase) -> Option<PathBuf> {
        let ext = match phase {
            Phase::Succeeded => SUCCESS_EXT,
            Phase::Failed => FAILURE_EXT,
            _ => return None,
        };
        Some(self.dir.join(format!("{name}.{ext}")))
    }

    /// Terminal phases recorded in the archive, by job name. When both
    /// records exist for a name, the failure wins.
    pub async fn scan(&self) -> Result<BTreeMap<String, Phase>> {
        let io_err = |e: std::io::Error| QupodsError::io(&self.dir, e);
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            if !entry.file_type().await.map_err(io_err)?.is_file() {
                continue;
            }
            let path = entry.path();
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|e| e.to_str()),
            ) else {
                continue;
            };
            match ext {
                SUCCESS_EXT => succeeded.push(stem.to_string()),
                FAILURE_EXT => failed.push(stem.to_string()),
                _ => {}
            }
        }

        let mut phases = BTreeMap::new();
        for name in succeeded {
            debug!(job = %name, "archived as Succeeded");
            phases.insert(name, Phase::Succeeded);
        }
        for name in failed {
            debug!(job = %name, "archived as Failed");
            phases.insert(name, Phase::Failed);
        }
        Ok(phases)
    }

    /// Save the logs of a job that just reached `phase`, then delete it from the cluster.
    ///
    /// Fetch and write failures abort immediately; the delete is retried with
    /// exponential backoff before giving up.
    pub async fn archive<C: ClusterClient>(
        &self,
        client: &C,
        name: &str,
        phase: Phase,
    ) -> Result<PathBuf> {
        let path = self
            .record_path(name, phase)
            .ok_or_else(|| QupodsError::archive(name, format!("phase {phase} is not terminal")))?;

        let logs = client
            .logs(name)
            .await
            .map_err(|e| QupodsError::archive(name, format!("fetching logs: {e}")))?;
        tokio::fs::write(&path, &logs)
            .await
            .map_err(|e| QupodsError::io(&path, e))?;

        self.delete_with_retry(client, name).await?;
        info!(job = %name, %phase, archive = %path.display(), "archived and deleted");
        Ok(path)
    }

    /// Delete a job whose record is already in the archive, leaving the record untouched.
    pub async fn remove<C: ClusterClient>(&self, client: &C, name: &str) -> Result<()> {
        self.delete_with_retry(client, name).await?;
        info!(job = %name, "already archived, deleted");
        Ok(())
    }

    async fn delete_with_retry<C: ClusterClient>(&self, client: &C, name: &str) -> Result<()> {
        let mut attempt = 0;
        loop {
            match client.delete(name).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.delete_retry.max_retries => {
                    attempt += 1;
                    let delay_ms = self.delete_retry.delay_for_attempt(attempt);
                    warn!(
                        job = %name,
                        "delete failed, retry {attempt}/{} in {delay_ms}ms: {e}",
                        self.delete_retry.max_retries
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => {
                    return Err(QupodsError::archive(
                        name,
                        format!("delete failed after {} attempts: {e}", attempt + 1),
                    ));
                }
            }
        }
    }
}
