use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::{RemediationOutcome, Remediator};
use crate::{config::RemediationConfig, Error, Result};

/// Runs `<program> <playbook> [extra args...]` as a child process
pub struct PlaybookRunner {
    config: RemediationConfig,
    permits: Option<Arc<Semaphore>>,
}

impl PlaybookRunner {
    pub fn new(config: RemediationConfig) -> Self {
        let permits = match config.max_concurrent {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        Self { config, permits }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg(&self.config.playbook_path)
            .args(&self.config.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            program: self.config.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl Remediator for PlaybookRunner {
    fn describe(&self) -> String {
        let mut parts = vec![
            self.config.program.clone(),
            self.config.playbook_path.display().to_string(),
        ];
        parts.extend(self.config.extra_args.iter().cloned());
        parts.join(" ")
    }

    async fn remediate(&self) -> Result<RemediationOutcome> {
        let _permit = match &self.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|e| Error::Internal(e.to_string()))?,
            ),
            None => None,
        };

        info!("Running remediation: {}", self.describe());

        let started = Instant::now();
        let mut child = self.command().spawn().map_err(|e| self.spawn_error(e))?;

        let collected = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, collect_output(&mut child)).await {
                Ok(collected) => collected,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        error!("Failed to kill {}: {}", self.config.program, e);
                    }
                    return Err(Error::Timeout {
                        program: self.config.program.clone(),
                        timeout: limit,
                    });
                }
            },
            None => collect_output(&mut child).await,
        };
        let (status, stdout, stderr) = collected.map_err(|e| self.spawn_error(e))?;

        let outcome = RemediationOutcome {
            success: status.success(),
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            elapsed: started.elapsed(),
        };

        if !outcome.stdout.is_empty() {
            info!("{}", outcome.stdout);
        }
        if !outcome.stderr.is_empty() {
            warn!("{}", outcome.stderr);
        }

        if !outcome.success {
            warn!("{} exited with {}", self.config.program, status);
            if self.config.fail_on_nonzero_exit {
                return Err(Error::NonZeroExit {
                    program: self.config.program.clone(),
                    status: status.to_string(),
                });
            }
        }

        Ok(outcome)
    }
}

/// Waits for the child while draining both pipes, so a chatty command
/// cannot block on a full pipe buffer.
async fn collect_output(child: &mut Child) -> std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let read_stdout = async {
        if let Some(pipe) = stdout_pipe.as_mut() {
            pipe.read_to_end(&mut stdout).await?;
        }
        Ok::<_, std::io::Error>(())
    };
    let read_stderr = async {
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut stderr).await?;
        }
        Ok::<_, std::io::Error>(())
    };

    let (status, stdout_read, stderr_read) = tokio::join!(child.wait(), read_stdout, read_stderr);
    stdout_read?;
    stderr_read?;

    Ok((status?, stdout, stderr))
}
