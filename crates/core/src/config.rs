//! Extension configuration.
//!
//! [`ExtensionConfig`] holds every parameter the build step accepts.
//!
//! # Loading priority
//! 1. CLI arguments (highest)
//! 2. Environment variables (`ESTAFETTE_EXTENSION_FAIL_ON=upgradable`)
//! 3. Defaults (`Default` impl)
//!
//! The CI system passes stage parameters as `ESTAFETTE_EXTENSION_*` variables
//! and build metadata as `ESTAFETTE_GIT_*` / `ESTAFETTE_BUILD_*`.
//!
//! # Example
//! ```
//! use snykstep_core::config::ExtensionConfig;
//!
//! let mut config = ExtensionConfig::default();
//! config.fail_on = "upgradable".to_owned();
//! config.validate().unwrap();
//!
//! let flags = config.to_flags().unwrap();
//! assert!(flags.all_projects);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::credentials::DEFAULT_TOKEN_PATH;
use crate::error::ConfigError;
use crate::types::{FailOn, Severity, SnykFlags};

/// All build step parameters.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// `all`, `upgradable` or `patchable`; empty omits `--fail-on`
    pub fail_on: String,
    /// Manifest to test when not scanning all projects
    pub file: String,
    pub packages_folder: String,
    /// `low`, `medium`, `high` or `critical`; empty omits the flag
    pub severity_threshold: String,
    pub project_name: String,
    pub remote_repo_url: String,
    pub all_projects: bool,
    /// Directory names neither detection nor snyk descend into
    pub exclude_directories: Vec<String>,
    pub debug: bool,

    pub container_image: String,
    pub scan_iac: bool,

    pub maven_mirror_url: String,
    pub maven_username: String,
    #[serde(skip_serializing)]
    pub maven_password: String,
    pub maven_update_parent: bool,
    /// Template rendered into the maven settings file
    pub maven_settings_template: String,
    pub maven_settings_path: String,

    pub snyk_api_token_path: String,

    pub repo_owner: String,
    pub repo_name: String,
    pub build_version_major: String,
    pub build_version_minor: String,

    /// `plaintext`, `console`, `pretty`, `json`, `stackdriver` or `v3`
    pub log_format: String,
    pub log_level: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            fail_on: "all".to_owned(),
            file: String::new(),
            packages_folder: String::new(),
            severity_threshold: "high".to_owned(),
            project_name: String::new(),
            remote_repo_url: String::new(),
            all_projects: true,
            exclude_directories: vec![
                "node_modules".to_owned(),
                ".git".to_owned(),
                "dist".to_owned(),
            ],
            debug: false,
            container_image: String::new(),
            scan_iac: false,
            maven_mirror_url: String::new(),
            maven_username: String::new(),
            maven_password: String::new(),
            maven_update_parent: false,
            maven_settings_template: "/settings.xml".to_owned(),
            maven_settings_path: "/root/.m2/settings.xml".to_owned(),
            snyk_api_token_path: DEFAULT_TOKEN_PATH.to_owned(),
            repo_owner: String::new(),
            repo_name: String::new(),
            build_version_major: String::new(),
            build_version_minor: String::new(),
            log_format: "plaintext".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for ExtensionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionConfig")
            .field("fail_on", &self.fail_on)
            .field("file", &self.file)
            .field("packages_folder", &self.packages_folder)
            .field("severity_threshold", &self.severity_threshold)
            .field("project_name", &self.project_name)
            .field("remote_repo_url", &self.remote_repo_url)
            .field("all_projects", &self.all_projects)
            .field("exclude_directories", &self.exclude_directories)
            .field("debug", &self.debug)
            .field("container_image", &self.container_image)
            .field("scan_iac", &self.scan_iac)
            .field("maven_mirror_url", &self.maven_mirror_url)
            .field("maven_username", &self.maven_username)
            .field("maven_update_parent", &self.maven_update_parent)
            .field("snyk_api_token_path", &self.snyk_api_token_path)
            .field("repo_owner", &self.repo_owner)
            .field("repo_name", &self.repo_name)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl ExtensionConfig {
    /// Defaults plus environment overrides, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Overrides values from the environment.
    ///
    /// Unset variables leave the current value alone. Booleans that fail to
    /// parse are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        // Stage parameters
        override_string(&mut self.fail_on, "ESTAFETTE_EXTENSION_FAIL_ON");
        override_string(&mut self.file, "ESTAFETTE_EXTENSION_FILE");
        override_string(
            &mut self.packages_folder,
            "ESTAFETTE_EXTENSION_PACKAGES_FOLDER",
        );
        override_string(
            &mut self.severity_threshold,
            "ESTAFETTE_EXTENSION_SEVERITY_THRESHOLD",
        );
        override_string(&mut self.project_name, "ESTAFETTE_EXTENSION_PROJECT_NAME");
        override_string(
            &mut self.remote_repo_url,
            "ESTAFETTE_EXTENSION_REMOTE_REPO_URL",
        );
        override_bool(&mut self.all_projects, "ESTAFETTE_EXTENSION_ALL_PROJECTS");
        override_csv(
            &mut self.exclude_directories,
            "ESTAFETTE_EXTENSION_EXCLUDE_DIRECTORIES",
        );
        override_bool(&mut self.debug, "ESTAFETTE_EXTENSION_DEBUG");
        override_string(
            &mut self.container_image,
            "ESTAFETTE_EXTENSION_CONTAINER_IMAGE",
        );
        override_bool(&mut self.scan_iac, "ESTAFETTE_EXTENSION_SCAN_IAC");

        // Maven
        override_string(
            &mut self.maven_mirror_url,
            "ESTAFETTE_EXTENSION_MAVEN_MIRROR_URL",
        );
        override_string(
            &mut self.maven_username,
            "ESTAFETTE_EXTENSION_MAVEN_USERNAME",
        );
        override_string(
            &mut self.maven_password,
            "ESTAFETTE_EXTENSION_MAVEN_PASSWORD",
        );
        override_bool(
            &mut self.maven_update_parent,
            "ESTAFETTE_EXTENSION_MAVEN_UPDATE_PARENT",
        );
        override_string(
            &mut self.maven_settings_template,
            "ESTAFETTE_EXTENSION_MAVEN_SETTINGS_TEMPLATE",
        );
        override_string(
            &mut self.maven_settings_path,
            "ESTAFETTE_EXTENSION_MAVEN_SETTINGS_PATH",
        );

        // Build metadata
        override_string(&mut self.repo_owner, "ESTAFETTE_GIT_OWNER");
        override_string(&mut self.repo_name, "ESTAFETTE_GIT_NAME");
        override_string(
            &mut self.build_version_major,
            "ESTAFETTE_BUILD_VERSION_MAJOR",
        );
        override_string(
            &mut self.build_version_minor,
            "ESTAFETTE_BUILD_VERSION_MINOR",
        );
        if let Ok(version) = std::env::var("ESTAFETTE_BUILD_VERSION") {
            self.fill_build_version(&version);
        }

        // Logging
        override_string(&mut self.log_format, "ESTAFETTE_LOG_FORMAT");
    }

    /// Fills empty major/minor parts from a full build version.
    ///
    /// Versions that are not valid semver are ignored.
    pub fn fill_build_version(&mut self, version: &str) {
        if !self.build_version_major.is_empty() && !self.build_version_minor.is_empty() {
            return;
        }
        match semver::Version::parse(version) {
            Ok(parsed) => {
                if self.build_version_major.is_empty() {
                    self.build_version_major = parsed.major.to_string();
                }
                if self.build_version_minor.is_empty() {
                    self.build_version_minor = parsed.minor.to_string();
                }
            }
            Err(e) => debug!(version, error = %e, "build version is not semver, ignoring"),
        }
    }

    /// Validates value sets and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fail_on.is_empty() && FailOn::from_str_loose(&self.fail_on).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "fail_on".to_owned(),
                reason: "must be one of: all, upgradable, patchable".to_owned(),
            });
        }

        if !self.severity_threshold.is_empty()
            && Severity::from_str_loose(&self.severity_threshold).is_none()
        {
            return Err(ConfigError::InvalidValue {
                field: "severity_threshold".to_owned(),
                reason: "must be one of: low, medium, high, critical".to_owned(),
            });
        }

        let valid_formats = ["plaintext", "console", "pretty", "json", "stackdriver", "v3"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        // Mirror credentials are all-or-nothing
        let mirror = [
            &self.maven_mirror_url,
            &self.maven_username,
            &self.maven_password,
        ];
        let set = mirror.iter().filter(|v| !v.is_empty()).count();
        if set != 0 && set != mirror.len() {
            return Err(ConfigError::InvalidValue {
                field: "maven_mirror_url".to_owned(),
                reason: "maven mirror url, username and password must be set together"
                    .to_owned(),
            });
        }

        if self.snyk_api_token_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "snyk_api_token_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// Converts the configuration into scan flags.
    ///
    /// Detection results (`language`, `sub_projects`) are left empty.
    pub fn to_flags(&self) -> Result<SnykFlags, ConfigError> {
        let fail_on = parse_optional(&self.fail_on, "fail_on", FailOn::from_str_loose)?;
        let severity_threshold = parse_optional(
            &self.severity_threshold,
            "severity_threshold",
            Severity::from_str_loose,
        )?;

        Ok(SnykFlags {
            fail_on,
            file: self.file.clone(),
            packages_folder: self.packages_folder.clone(),
            severity_threshold,
            project_name: self.project_name.clone(),
            remote_repo_url: self.remote_repo_url.clone(),
            all_projects: self.all_projects,
            exclude_directories: self
                .exclude_directories
                .iter()
                .filter(|d| !d.is_empty())
                .cloned()
                .collect(),
            debug: self.debug,
            container_image: self.container_image.clone(),
            scan_iac: self.scan_iac,
            maven_mirror_url: self.maven_mirror_url.clone(),
            maven_username: self.maven_username.clone(),
            maven_password: self.maven_password.clone(),
            maven_update_parent: self.maven_update_parent,
            build_version_major: self.build_version_major.clone(),
            build_version_minor: self.build_version_minor.clone(),
            ..Default::default()
        })
    }
}

fn parse_optional<T>(
    value: &str,
    field: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse(value).map(Some).ok_or_else(|| ConfigError::ParseFailed {
        reason: format!("invalid {field}: '{value}'"),
    })
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().to_lowercase().parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
