//! Domain types shared by detection, preparation and the snyk invocations.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Package managers the extension knows how to detect.
///
/// The derived `Ord` follows declaration order and fixes the order in which
/// detected sub-projects are prepared.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PackageManager {
    #[default]
    Unknown,
    GoModules,
    Npm,
    Maven,
    Nuget,
    Pip,
    Docker,
}

impl PackageManager {
    /// Every detectable package manager, in detection order.
    pub const ALL: [PackageManager; 6] = [
        Self::Npm,
        Self::Maven,
        Self::Pip,
        Self::GoModules,
        Self::Nuget,
        Self::Docker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::GoModules => "GoModules",
            Self::Npm => "Npm",
            Self::Maven => "Maven",
            Self::Nuget => "Nuget",
            Self::Pip => "Pip",
            Self::Docker => "Docker",
        }
    }

    /// File name globs that mark a directory as a sub-project of this manager.
    pub fn marker_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Unknown => &[],
            Self::GoModules => &["go.mod"],
            Self::Npm => &["package.json"],
            Self::Maven => &["pom.xml"],
            Self::Nuget => &[
                "project.assets.json",
                "packages.config",
                "project.json",
                "*.sln",
            ],
            Self::Pip => &["requirements.txt", "Pipfile", "setup.py"],
            Self::Docker => &["Dockerfile*"],
        }
    }

    /// Whether a failed preparation step only logs a warning.
    ///
    /// `true` for managers snyk support is still partial for.
    pub fn ignore_errors(&self) -> bool {
        matches!(self, Self::Nuget | Self::Pip | Self::Docker)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary language of the checkout, decided by a single marker file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    Unknown,
    Golang,
    Node,
    Maven,
    Dotnet,
    Python,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Golang => write!(f, "Golang"),
            Self::Node => write!(f, "Node"),
            Self::Maven => write!(f, "Maven"),
            Self::Dotnet => write!(f, "Dotnet"),
            Self::Python => write!(f, "Python"),
        }
    }
}

/// Snyk issue severity.
///
/// `Ord` allows threshold comparison (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    #[default]
    High,
    Critical,
}

impl Severity {
    /// Case-insensitive parse.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Which vulnerabilities make `snyk test` fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    /// Any vulnerability
    #[default]
    All,
    /// Only vulnerabilities with an upgrade path
    Upgradable,
    /// Only vulnerabilities with an upgrade path or a patch
    Patchable,
}

impl FailOn {
    /// Case-insensitive parse.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "upgradable" => Some(Self::Upgradable),
            "patchable" => Some(Self::Patchable),
            _ => None,
        }
    }
}

impl fmt::Display for FailOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Upgradable => write!(f, "upgradable"),
            Self::Patchable => write!(f, "patchable"),
        }
    }
}

/// Detected sub-projects, keyed by package manager.
///
/// Paths are relative to the scanned root.
pub type SubProjects = BTreeMap<PackageManager, Vec<PathBuf>>;

/// Everything a scan run needs, after detection has filled in the blanks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnykFlags {
    pub language: Language,
    pub sub_projects: SubProjects,

    pub fail_on: Option<FailOn>,
    pub file: String,
    pub packages_folder: String,
    pub severity_threshold: Option<Severity>,
    pub project_name: String,
    pub remote_repo_url: String,
    pub all_projects: bool,
    pub exclude_directories: Vec<String>,
    pub debug: bool,

    /// Image reference for `snyk container test|monitor`; empty disables it.
    pub container_image: String,
    pub scan_iac: bool,

    pub maven_mirror_url: String,
    pub maven_username: String,
    #[serde(skip_serializing)]
    pub maven_password: String,
    pub maven_update_parent: bool,

    pub build_version_major: String,
    pub build_version_minor: String,
}

impl SnykFlags {
    /// Total number of detected sub-project marker files.
    pub fn sub_project_count(&self) -> usize {
        self.sub_projects.values().map(Vec::len).sum()
    }

    /// Whether detection found nothing the extension can scan.
    pub fn nothing_detected(&self) -> bool {
        self.sub_projects.is_empty() && self.language == Language::Unknown
    }

    /// Whether a complete maven mirror triple was passed as flags.
    pub fn has_maven_mirror(&self) -> bool {
        !self.maven_mirror_url.is_empty()
            && !self.maven_username.is_empty()
            && !self.maven_password.is_empty()
    }
}
