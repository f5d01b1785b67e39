//! Wrapper around the `snyk` command line tool.
//!
//! [`SnykCli`] is the seam the extension service drives; [`ProcessSnykCli`]
//! implements it by building argument lists from
//! [`SnykFlags`](snykstep_core::types::SnykFlags) and interpreting the
//! documented snyk exit codes.

pub mod args;
pub mod client;
pub mod error;

pub use args::{ScanKind, monitor_args, test_args};
pub use client::{ProcessSnykCli, ScanOutcome, ScanRun, SnykCli, interpret_exit};
pub use error::SnykCliError;
