//! Client for the Snyk v1 REST API.
//!
//! Used by the `projects` subcommand to report what Snyk currently monitors.

pub mod client;
pub mod error;

pub use client::{DEFAULT_BASE_URL, HttpSnykApiClient, SnykApi, SnykApiConfig};
pub use error::SnykApiError;
