//! Subprocess execution with a timeout.
//!
//! Every external program (git, the package manager) goes through
//! [`CommandRunner`] so the reconciliation logic can be tested against a mock.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// A program invocation: program, arguments, working directory and time budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I, cwd: &Path, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.to_path_buf(),
            timeout,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command `{command}` ({cwd:?}) could not be started: {source}")]
    Spawn {
        command: String,
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Command `{command}` ({cwd:?}) failed. Error:\n============== ERROR ==============\n{output}\n==================================="
    )]
    Failed {
        command: String,
        cwd: PathBuf,
        output: String,
    },

    #[error("Command `{command}` ({cwd:?}) timeout [{} seconds].", .timeout.as_secs_f64())]
    Timeout {
        command: String,
        cwd: PathBuf,
        timeout: Duration,
    },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout { .. })
    }

    /// Captured output of a failed command, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandError::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Runs a command to completion and returns its stdout.
///
/// Non-zero exit, spawn failures and timeouts are returned as [`CommandError`]
/// wrapped in `anyhow::Error`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<String>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

#[async_trait]
impl CommandRunner for TokioRunner {
    #[tracing::instrument(skip(self, spec), fields(command = %spec))]
    async fn run(&self, spec: &CommandSpec) -> Result<String> {
        debug!("Running `{}` in {:?} (timeout {:?})", spec, spec.cwd, spec.timeout);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| CommandError::Spawn {
            command: spec.to_string(),
            cwd: spec.cwd.clone(),
            source,
        })?;

        // Dropping the pending future on timeout drops the child, which kills it.
        let output = match timeout(spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(CommandError::Spawn {
                    command: spec.to_string(),
                    cwd: spec.cwd.clone(),
                    source,
                }
                .into());
            }
            Err(_) => {
                return Err(CommandError::Timeout {
                    command: spec.to_string(),
                    cwd: spec.cwd.clone(),
                    timeout: spec.timeout,
                }
                .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            debug!("`{}` succeeded", spec);
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let captured = if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else if !stdout.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            format!("exited with {}", output.status)
        };
        Err(CommandError::Failed {
            command: spec.to_string(),
            cwd: spec.cwd.clone(),
            output: captured,
        }
        .into())
    }
}
