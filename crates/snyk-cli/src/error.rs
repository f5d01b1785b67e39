//! snyk CLI error types

use snykstep_core::error::CommandError;

/// Errors from a snyk invocation.
#[derive(Debug, thiserror::Error)]
pub enum SnykCliError {
    /// Exit code 1: the scan found vulnerabilities above the threshold
    #[error("'{command}' found vulnerabilities")]
    VulnerabilitiesFound { command: String },

    /// Exit code 2: snyk itself failed
    #[error("'{command}' failed, try to re-run the build")]
    Failure { command: String },

    /// Any other process failure
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl SnykCliError {
    /// Whether this error means the scan ran and found issues.
    pub fn is_vulnerabilities_found(&self) -> bool {
        matches!(self, Self::VulnerabilitiesFound { .. })
    }
}
