//! snykstep extension: detection, preparation and scan orchestration.
//!
//! # Modules
//!
//! - [`detect`]: sub-project and language detection over the checkout
//! - [`prepare`]: package manager preparation (npm, dotnet, pip, maven)
//! - [`service`]: [`ExtensionService`] tying detection, preparation and the
//!   snyk CLI together
//! - [`error`]: [`ExtensionError`]

pub mod detect;
pub mod error;
pub mod prepare;
pub mod service;

pub use detect::{detect_language, detect_sub_projects, find_file_matches};
pub use error::ExtensionError;
pub use prepare::{MavenMirror, render_maven_settings, write_maven_settings};
pub use service::{ExtensionService, RunSummary, ServiceOptions};
