//! Argument construction for `snyk test` and `snyk monitor`.
//!
//! Pure functions from [`SnykFlags`] to argument vectors; the program name
//! itself is not included.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use snykstep_core::types::{PackageManager, SnykFlags};

/// Which snyk product a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanKind {
    /// Dependency manifests (`snyk test`)
    OpenSource,
    /// A container image (`snyk container test`)
    Container,
    /// Infrastructure-as-code files (`snyk iac test`)
    Iac,
}

impl ScanKind {
    /// Subcommand words preceding `test` / `monitor`.
    fn prefix(&self) -> &'static [&'static str] {
        match self {
            Self::OpenSource => &[],
            Self::Container => &["container"],
            Self::Iac => &["iac"],
        }
    }

    /// Kinds `snyk test` runs for `flags`, in order.
    pub fn for_test(flags: &SnykFlags) -> Vec<ScanKind> {
        let mut kinds = vec![Self::OpenSource];
        if !flags.container_image.is_empty() {
            kinds.push(Self::Container);
        }
        if flags.scan_iac {
            kinds.push(Self::Iac);
        }
        kinds
    }

    /// Kinds `snyk monitor` runs for `flags`, in order.
    ///
    /// IaC results cannot be monitored.
    pub fn for_monitor(flags: &SnykFlags) -> Vec<ScanKind> {
        let mut kinds = vec![Self::OpenSource];
        if !flags.container_image.is_empty() {
            kinds.push(Self::Container);
        }
        kinds
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenSource => write!(f, "open-source"),
            Self::Container => write!(f, "container"),
            Self::Iac => write!(f, "iac"),
        }
    }
}

/// Arguments for `snyk [container|iac] test`.
pub fn test_args(kind: ScanKind, flags: &SnykFlags) -> Vec<String> {
    let mut args: Vec<String> = kind.prefix().iter().map(|s| (*s).to_owned()).collect();
    args.push("test".to_owned());

    match kind {
        ScanKind::OpenSource => {
            push_target_args(&mut args, flags);
            if let Some(fail_on) = flags.fail_on {
                args.push(format!("--fail-on={fail_on}"));
            }
            if !flags.packages_folder.is_empty() {
                args.push(format!("--packages-folder={}", flags.packages_folder));
            }
        }
        ScanKind::Container => push_container_args(&mut args, flags),
        ScanKind::Iac => {}
    }

    if let Some(threshold) = flags.severity_threshold {
        args.push(format!("--severity-threshold={threshold}"));
    }
    if flags.debug {
        args.push("-d".to_owned());
    }
    args
}

/// Arguments for `snyk [container] monitor`.
pub fn monitor_args(kind: ScanKind, flags: &SnykFlags) -> Vec<String> {
    let mut args: Vec<String> = kind.prefix().iter().map(|s| (*s).to_owned()).collect();
    args.push("monitor".to_owned());

    match kind {
        ScanKind::OpenSource => push_target_args(&mut args, flags),
        ScanKind::Container => push_container_args(&mut args, flags),
        ScanKind::Iac => {}
    }

    if flags.debug {
        args.push("-d".to_owned());
    }
    args
}

fn push_target_args(args: &mut Vec<String>, flags: &SnykFlags) {
    if !flags.remote_repo_url.is_empty() {
        args.push(format!("--remote-repo-url={}", flags.remote_repo_url));
    }
    if flags.all_projects {
        args.push("--all-projects".to_owned());
        if !flags.exclude_directories.is_empty() {
            args.push(format!("--exclude={}", flags.exclude_directories.join(",")));
        }
    } else {
        // --project-name and --file are rejected in combination with --all-projects
        if !flags.project_name.is_empty() {
            args.push(format!("--project-name={}", flags.project_name));
        }
        if !flags.file.is_empty() {
            args.push(format!("--file={}", flags.file));
        }
    }
}

fn push_container_args(args: &mut Vec<String>, flags: &SnykFlags) {
    args.push(flags.container_image.clone());
    let dockerfile = flags
        .sub_projects
        .get(&PackageManager::Docker)
        .and_then(|paths| primary_dockerfile(paths));
    if let Some(dockerfile) = dockerfile {
        args.push(format!("--file={}", dockerfile.display()));
    }
    if !flags.project_name.is_empty() {
        args.push(format!("--project-name={}", flags.project_name));
    }
}

/// The root `Dockerfile` if present, otherwise the shallowest candidate.
fn primary_dockerfile(paths: &[PathBuf]) -> Option<&PathBuf> {
    paths
        .iter()
        .find(|path| path.as_path() == Path::new("Dockerfile"))
        .or_else(|| paths.iter().min_by_key(|path| path.components().count()))
}
