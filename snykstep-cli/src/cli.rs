//! CLI argument parsing using clap derive API
//!
//! Purely declarative. Stage parameters are read from the environment by
//! [`ExtensionConfig`](snykstep_core::config::ExtensionConfig); the flags
//! here only override them.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// snykstep -- Snyk dependency scanning as a CI build step.
///
/// Use `snykstep <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "snykstep", version, about, long_about = None)]
pub struct Cli {
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Override log format (plaintext, console, pretty, json, stackdriver, v3).
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect, prepare and scan the checkout (the build step itself).
    Run(RunArgs),

    /// Show detected language and sub-projects without scanning.
    Detect(DetectArgs),

    /// List Snyk organizations and their monitored projects.
    Projects(ProjectsArgs),
}

// ---- run ----

/// Run the build step against a checkout.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Checkout to scan.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Path of the injected credentials file.
    #[arg(long)]
    pub credentials_path: Option<String>,

    /// Path or name of the snyk binary.
    #[arg(long, default_value = "snyk")]
    pub snyk_binary: String,

    /// Override fail-on (all, upgradable, patchable).
    #[arg(long)]
    pub fail_on: Option<String>,

    /// Override severity threshold (low, medium, high, critical).
    #[arg(long)]
    pub severity_threshold: Option<String>,

    /// Override the manifest file passed to snyk.
    #[arg(long)]
    pub file: Option<String>,

    /// Override the project name.
    #[arg(long)]
    pub project_name: Option<String>,

    /// Container image to scan in addition to the dependencies.
    #[arg(long)]
    pub container_image: Option<String>,

    /// Also scan infrastructure-as-code files.
    #[arg(long)]
    pub scan_iac: bool,

    /// Pass `-d` to every snyk command.
    #[arg(long)]
    pub debug: bool,
}

// ---- detect ----

/// Detect sub-projects in a directory.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Directory to inspect (default: current directory).
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Directory names not to descend into (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,
}

// ---- projects ----

/// List organizations and projects through the Snyk API.
#[derive(Args, Debug)]
pub struct ProjectsArgs {
    /// Only show the organization with this id, slug or name.
    #[arg(long)]
    pub org: Option<String>,

    /// Also fetch open vulnerabilities per project.
    #[arg(long)]
    pub issues: bool,

    /// Path of the injected credentials file.
    #[arg(long)]
    pub credentials_path: Option<String>,

    /// Snyk API root.
    #[arg(long, env = "SNYK_API_URL", default_value = snykstep_snyk_api::DEFAULT_BASE_URL)]
    pub api_url: String,
}
