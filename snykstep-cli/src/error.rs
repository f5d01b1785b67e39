//! CLI-specific error types and exit code mapping

use snykstep_core::error::{ConfigError, CredentialsError};
use snykstep_extension::ExtensionError;
use snykstep_snyk_api::SnykApiError;
use snykstep_snyk_cli::SnykCliError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to the exit status of the build
/// step.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The injected Snyk credential is missing or unusable.
    #[error("credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// `snyk test` found vulnerabilities above the threshold.
    #[error("{0}")]
    Vulnerabilities(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Snyk REST API failure.
    #[error("snyk api error: {0}")]
    Api(#[from] SnykApiError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (checkout access, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                   |
    /// |------|-------------------------------------------|
    /// | 0    | Success, or nothing to scan               |
    /// | 1    | Vulnerabilities found / command error     |
    /// | 2    | Configuration error                       |
    /// | 3    | Credentials error                         |
    /// | 10   | IO error                                  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Credentials(_) => 3,
            Self::Io(_) => 10,
            Self::Vulnerabilities(_) | Self::Command(_) | Self::Api(_) | Self::JsonSerialize(_) => 1,
        }
    }
}

impl From<ExtensionError> for CliError {
    fn from(e: ExtensionError) -> Self {
        match e {
            ExtensionError::Credentials(e) => Self::Credentials(e),
            ExtensionError::Io { path, source } => {
                Self::Io(std::io::Error::new(source.kind(), format!("{path}: {source}")))
            }
            ExtensionError::Snyk(e @ SnykCliError::VulnerabilitiesFound { .. }) => {
                Self::Vulnerabilities(e.to_string())
            }
            other => Self::Command(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use snykstep_core::error::CommandError;

    use super::*;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config(ConfigError::InvalidValue {
            field: "fail_on".to_owned(),
            reason: "must be one of: all, upgradable, patchable".to_owned(),
        });
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_credentials_error() {
        let err = CliError::from(CredentialsError::EmptyToken);
        assert_eq!(err.exit_code(), 3, "credentials error should return exit code 3");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "checkout not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_vulnerabilities() {
        let err = CliError::from(ExtensionError::Snyk(SnykCliError::VulnerabilitiesFound {
            command: "snyk test --all-projects".to_owned(),
        }));
        assert!(matches!(err, CliError::Vulnerabilities(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("found vulnerabilities"));
    }

    #[test]
    fn test_extension_credentials_keep_their_exit_code() {
        let err = CliError::from(ExtensionError::Credentials(
            CredentialsError::InjectedCredentialsFileMissing {
                path: "/credentials/snyk_api_token.json".to_owned(),
            },
        ));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_extension_io_keeps_path() {
        let err = CliError::from(ExtensionError::Io {
            path: "/estafette-work".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        assert_eq!(err.exit_code(), 10);
        assert!(err.to_string().contains("/estafette-work"));
    }

    #[test]
    fn test_preparation_failure_is_command_error() {
        let err = CliError::from(ExtensionError::Preparation {
            package_manager: "Npm".to_owned(),
            source: CommandError::ExitStatus {
                command: "npm install".to_owned(),
                code: 1,
            },
        });
        assert!(matches!(err, CliError::Command(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("npm install"));
    }
}
