//! snykstep core: errors, configuration, domain types, Snyk API models,
//! injected credentials and the external process seam.
//!
//! The other workspace crates depend on the traits defined here
//! ([`CredentialsClient`], [`CommandRunner`]) rather than on concrete
//! implementations, so each can be exercised without a real `snyk` binary.

pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod runner;
pub mod types;

// Errors
pub use error::{CommandError, ConfigError, CredentialsError};

// Config
pub use config::ExtensionConfig;

// Credentials
pub use credentials::{CredentialsClient, FileCredentialsClient};

// Process seam
pub use runner::{CommandRunner, CommandSpec, ProcessRunner};

// Domain types
pub use types::{FailOn, Language, PackageManager, Severity, SnykFlags, SubProjects};
