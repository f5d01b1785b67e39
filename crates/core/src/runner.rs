//! External process seam.
//!
//! Every shell-out (`snyk`, `npm`, `mvn`, `dotnet`, `pip`) goes through
//! [`CommandRunner`]. [`ProcessRunner`] runs the program with inherited stdio
//! so its output lands in the build log, and kills it when the step is
//! cancelled.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CommandError;

/// A program invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// Values masked when the command line is logged.
    pub secrets: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Masks `secret` wherever it appears in the logged command line.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }
}

/// Renders the command line with secrets masked.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        for secret in &self.secrets {
            line = line.replace(secret.as_str(), "***");
        }
        f.write_str(&line)
    }
}

/// Runs external programs.
pub trait CommandRunner: Send + Sync + 'static {
    /// Runs `spec` to completion.
    ///
    /// # Errors
    ///
    /// - `CommandError::Spawn` if the program cannot be started
    /// - `CommandError::ExitStatus` on a non-zero exit
    /// - `CommandError::Cancelled` if the step was cancelled meanwhile
    fn run(&self, spec: &CommandSpec) -> impl Future<Output = Result<(), CommandError>> + Send;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    cancel: CancellationToken,
}

impl ProcessRunner {
    /// Creates a runner whose children are killed once `cancel` fires.
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<(), CommandError> {
        let command_line = spec.to_string();
        info!(command = %command_line, dir = ?spec.current_dir, "running command");

        if self.cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                command: command_line,
            });
        }

        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| CommandError::Spawn {
            command: command_line.clone(),
            source: e,
        })?;

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| CommandError::Spawn {
                command: command_line.clone(),
                source: e,
            })?,
            () = self.cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "failed to kill cancelled child");
                }
                return Err(CommandError::Cancelled { command: command_line });
            }
        };

        if status.success() {
            return Ok(());
        }

        // Killed by a signal: no exit code, report as -1.
        let code = status.code().unwrap_or(-1);
        Err(CommandError::ExitStatus {
            command: command_line,
            code,
        })
    }
}
