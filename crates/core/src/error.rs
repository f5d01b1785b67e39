//! Error types, one enum per concern

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A value is outside its allowed set
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors reading the injected Snyk API token.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// Neither the credentials file nor the env fallback exists
    #[error("the credentials file at {path} is missing and no credentials were injected via env")]
    InjectedCredentialsFileMissing { path: String },

    /// The credentials array was empty or the token was blank
    #[error("the injected credentials contain no token")]
    EmptyToken,

    /// Reading the credentials file failed
    #[error("failed reading credentials file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The credentials JSON was malformed
    #[error("failed parsing credentials: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from running an external program.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be started
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully
    #[error("'{command}' exited with code {code}")]
    ExitStatus { command: String, code: i32 },

    /// The program was killed because the step was cancelled
    #[error("'{command}' was cancelled")]
    Cancelled { command: String },
}

impl CommandError {
    /// Exit code of the child, if it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExitStatus { code, .. } => Some(*code),
            Self::Spawn { .. } | Self::Cancelled { .. } => None,
        }
    }
}
