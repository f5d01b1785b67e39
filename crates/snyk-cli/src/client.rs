//! The [`SnykCli`] trait and its process-backed implementation.
//!
//! # Exit codes
//!
//! | Code | Meaning                        | Result                     |
//! |------|--------------------------------|----------------------------|
//! | 0    | success, no vulnerabilities    | `Ok(ScanOutcome::NoIssues)` |
//! | 1    | action needed, vulns found     | `Err(VulnerabilitiesFound)` |
//! | 2    | failure, re-run the command    | `Err(Failure)`              |
//! | 3    | no supported projects detected | `Ok(ScanOutcome::NoSupportedProjects)` |

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use snykstep_core::error::CommandError;
use snykstep_core::runner::{CommandRunner, CommandSpec};
use snykstep_core::types::SnykFlags;

use crate::args::{ScanKind, monitor_args, test_args};
use crate::error::SnykCliError;

/// Result of a snyk invocation that did not fail the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    NoIssues,
    NoSupportedProjects,
}

/// One completed `test` or `monitor` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanRun {
    pub kind: ScanKind,
    pub outcome: ScanOutcome,
}

/// Maps the result of a snyk process onto an outcome.
pub fn interpret_exit(
    command: &str,
    result: Result<(), CommandError>,
) -> Result<ScanOutcome, SnykCliError> {
    match result {
        Ok(()) => Ok(ScanOutcome::NoIssues),
        Err(e) => match e.exit_code() {
            Some(1) => Err(SnykCliError::VulnerabilitiesFound {
                command: command.to_owned(),
            }),
            Some(2) => Err(SnykCliError::Failure {
                command: command.to_owned(),
            }),
            Some(3) => {
                warn!(command, "snyk detected no supported projects");
                Ok(ScanOutcome::NoSupportedProjects)
            }
            _ => Err(SnykCliError::Command(e)),
        },
    }
}

/// Operations on the snyk command line tool.
pub trait SnykCli: Send + Sync + 'static {
    /// Authenticates the CLI with the API token.
    fn auth(&self) -> impl Future<Output = Result<(), SnykCliError>> + Send;

    /// Runs `snyk test` for every scan kind enabled in `flags`.
    ///
    /// Stops at the first kind that fails.
    fn test(
        &self,
        flags: &SnykFlags,
    ) -> impl Future<Output = Result<Vec<ScanRun>, SnykCliError>> + Send;

    /// Runs `snyk monitor` for every monitorable scan kind enabled in `flags`.
    fn monitor(
        &self,
        flags: &SnykFlags,
    ) -> impl Future<Output = Result<Vec<ScanRun>, SnykCliError>> + Send;
}

/// [`SnykCli`] that shells out through a [`CommandRunner`].
pub struct ProcessSnykCli<R: CommandRunner> {
    token: String,
    binary: String,
    /// Directory snyk runs in; the process cwd when unset
    current_dir: Option<PathBuf>,
    runner: Arc<R>,
}

impl<R: CommandRunner> ProcessSnykCli<R> {
    pub fn new(token: impl Into<String>, runner: Arc<R>) -> Self {
        Self {
            token: token.into(),
            binary: "snyk".to_owned(),
            current_dir: None,
            runner,
        }
    }

    /// Uses a different snyk executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Runs every snyk command in `dir`.
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn command(&self) -> CommandSpec {
        let spec = CommandSpec::new(self.binary.as_str());
        match &self.current_dir {
            Some(dir) => spec.current_dir(dir),
            None => spec,
        }
    }

    async fn run_scan(&self, kind: ScanKind, args: Vec<String>) -> Result<ScanRun, SnykCliError> {
        let spec = self.command().args(args);
        let command = spec.to_string();
        let outcome = interpret_exit(&command, self.runner.run(&spec).await)?;
        info!(command = %command, kind = %kind, outcome = ?outcome, "snyk command finished");
        Ok(ScanRun { kind, outcome })
    }
}

impl<R: CommandRunner> SnykCli for ProcessSnykCli<R> {
    async fn auth(&self) -> Result<(), SnykCliError> {
        let spec = self
            .command()
            .args(["auth", self.token.as_str()])
            .secret(self.token.as_str());
        self.runner.run(&spec).await?;
        Ok(())
    }

    async fn test(&self, flags: &SnykFlags) -> Result<Vec<ScanRun>, SnykCliError> {
        let mut runs = Vec::new();
        for kind in ScanKind::for_test(flags) {
            runs.push(self.run_scan(kind, test_args(kind, flags)).await?);
        }
        Ok(runs)
    }

    async fn monitor(&self, flags: &SnykFlags) -> Result<Vec<ScanRun>, SnykCliError> {
        let mut runs = Vec::new();
        for kind in ScanKind::for_monitor(flags) {
            runs.push(self.run_scan(kind, monitor_args(kind, flags)).await?);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Records invocations and replays queued exit codes (default 0).
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<CommandSpec>>,
        exit_codes: Mutex<VecDeque<i32>>,
    }

    impl RecordingRunner {
        fn with_exit_codes(codes: &[i32]) -> Self {
            Self {
                exit_codes: Mutex::new(codes.iter().copied().collect()),
                ..Default::default()
            }
        }

        fn command_lines(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<(), CommandError> {
            self.calls.lock().unwrap().push(spec.clone());
            match self.exit_codes.lock().unwrap().pop_front().unwrap_or(0) {
                0 => Ok(()),
                code => Err(CommandError::ExitStatus {
                    command: spec.to_string(),
                    code,
                }),
            }
        }
    }

    fn exit(code: i32) -> Result<(), CommandError> {
        Err(CommandError::ExitStatus {
            command: "snyk test".to_owned(),
            code,
        })
    }

    #[test]
    fn interpret_exit_codes() {
        assert_eq!(interpret_exit("snyk test", Ok(())).unwrap(), ScanOutcome::NoIssues);
        assert!(
            interpret_exit("snyk test", exit(1))
                .unwrap_err()
                .is_vulnerabilities_found()
        );
        assert!(matches!(
            interpret_exit("snyk test", exit(2)).unwrap_err(),
            SnykCliError::Failure { .. }
        ));
        assert_eq!(
            interpret_exit("snyk test", exit(3)).unwrap(),
            ScanOutcome::NoSupportedProjects
        );
        assert!(matches!(
            interpret_exit("snyk test", exit(127)).unwrap_err(),
            SnykCliError::Command(_)
        ));
    }

    #[test]
    fn interpret_cancelled_is_command_error() {
        let result = Err(CommandError::Cancelled {
            command: "snyk test".to_owned(),
        });
        assert!(matches!(
            interpret_exit("snyk test", result),
            Err(SnykCliError::Command(CommandError::Cancelled { .. }))
        ));
    }

    #[tokio::test]
    async fn auth_passes_token_but_masks_it() {
        let runner = Arc::new(RecordingRunner::default());
        let cli = ProcessSnykCli::new("tok-123", Arc::clone(&runner));

        cli.auth().await.unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].args, vec!["auth", "tok-123"]);
        assert_eq!(calls[0].to_string(), "snyk auth ***");
    }

    #[tokio::test]
    async fn auth_failure_is_not_reinterpreted() {
        let runner = Arc::new(RecordingRunner::with_exit_codes(&[3]));
        let cli = ProcessSnykCli::new("tok", runner);
        assert!(matches!(cli.auth().await, Err(SnykCliError::Command(_))));
    }

    #[tokio::test]
    async fn test_runs_every_enabled_kind() {
        let runner = Arc::new(RecordingRunner::default());
        let cli = ProcessSnykCli::new("tok", Arc::clone(&runner));
        let flags = SnykFlags {
            container_image: "estafette/api:1.0.0".to_owned(),
            scan_iac: true,
            ..Default::default()
        };

        let runs = cli.test(&flags).await.unwrap();

        assert_eq!(runs.len(), 3);
        assert_eq!(
            runner.command_lines(),
            vec![
                "snyk test",
                "snyk container test estafette/api:1.0.0",
                "snyk iac test",
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let runner = Arc::new(RecordingRunner::with_exit_codes(&[1]));
        let cli = ProcessSnykCli::new("tok", Arc::clone(&runner));
        let flags = SnykFlags {
            container_image: "estafette/api:1.0.0".to_owned(),
            ..Default::default()
        };

        let err = cli.test(&flags).await.unwrap_err();

        assert!(err.is_vulnerabilities_found());
        assert_eq!(runner.command_lines().len(), 1);
    }

    #[tokio::test]
    async fn monitor_tolerates_no_supported_projects() {
        let runner = Arc::new(RecordingRunner::with_exit_codes(&[3]));
        let cli = ProcessSnykCli::new("tok", Arc::clone(&runner)).with_binary("/usr/local/bin/snyk");

        let runs = cli.monitor(&SnykFlags::default()).await.unwrap();

        assert_eq!(runs[0].outcome, ScanOutcome::NoSupportedProjects);
        assert_eq!(runner.command_lines(), vec!["/usr/local/bin/snyk monitor"]);
    }

    #[tokio::test]
    async fn commands_run_in_current_dir() {
        let runner = Arc::new(RecordingRunner::default());
        let cli = ProcessSnykCli::new("tok", Arc::clone(&runner)).with_current_dir("/estafette-work");

        cli.auth().await.unwrap();
        cli.test(&SnykFlags::default()).await.unwrap();

        let calls = runner.calls.lock().unwrap();
        assert!(
            calls
                .iter()
                .all(|c| c.current_dir == Some(PathBuf::from("/estafette-work")))
        );
    }
}
