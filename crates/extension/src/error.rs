//! Extension service error types

use snykstep_core::error::{CommandError, CredentialsError};
use snykstep_snyk_cli::SnykCliError;

/// Errors from detection, preparation or the snyk run.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// Filesystem access failed
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A file name pattern did not compile
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Preparing a package manager failed
    #[error("failed preparing {package_manager} application: {source}")]
    Preparation {
        package_manager: String,
        #[source]
        source: CommandError,
    },

    /// Reading the injected credential failed
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// A snyk command failed
    #[error(transparent)]
    Snyk(#[from] SnykCliError),
}

impl ExtensionError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
