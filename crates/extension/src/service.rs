//! Extension service: detection, preparation and the snyk run.
//!
//! # Flow
//!
//! ```text
//! augment_flags ──> detect language + sub-projects, derive project name
//!       │
//!       ▼
//!      run ───────> prepare each package manager (BTreeMap order)
//!                   snyk auth -> snyk test -> snyk monitor
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use snykstep_core::config::ExtensionConfig;
use snykstep_core::credentials::CredentialsClient;
use snykstep_core::error::CommandError;
use snykstep_core::runner::{CommandRunner, CommandSpec};
use snykstep_core::types::{Language, PackageManager, SnykFlags};
use snykstep_snyk_cli::{ScanRun, SnykCli};

use crate::detect::{detect_language, detect_sub_projects};
use crate::error::ExtensionError;
use crate::prepare::{
    MavenMirror, maven_update_parent_command, preparation_commands, write_maven_settings,
};

/// Filesystem locations the service works with.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Checkout to detect and scan
    pub root: PathBuf,
    pub maven_settings_path: PathBuf,
    pub maven_settings_template: PathBuf,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from_config(&ExtensionConfig::default())
    }
}

impl ServiceOptions {
    pub fn from_config(config: &ExtensionConfig) -> Self {
        Self {
            root: PathBuf::from("."),
            maven_settings_path: PathBuf::from(&config.maven_settings_path),
            maven_settings_template: PathBuf::from(&config.maven_settings_template),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_maven_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.maven_settings_path = path.into();
        self
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Nothing scannable was detected
    pub skipped: bool,
    pub language: Language,
    pub sub_projects: usize,
    /// Preparation steps that completed
    pub prepared: Vec<String>,
    /// Preparation failures that were ignored
    pub warnings: Vec<String>,
    pub test: Vec<ScanRun>,
    pub monitor: Vec<ScanRun>,
}

/// Orchestrates a scan of one checkout.
pub struct ExtensionService<C, R, K>
where
    C: CredentialsClient,
    R: CommandRunner,
    K: SnykCli,
{
    credentials: Arc<C>,
    runner: Arc<R>,
    snyk: K,
    options: ServiceOptions,
}

impl<C, R, K> ExtensionService<C, R, K>
where
    C: CredentialsClient,
    R: CommandRunner,
    K: SnykCli,
{
    pub fn new(credentials: Arc<C>, runner: Arc<R>, snyk: K, options: ServiceOptions) -> Self {
        Self {
            credentials,
            runner,
            snyk,
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.options.root
    }

    /// Fills in detection results and derived names.
    ///
    /// - `language` and `sub_projects` from the checkout
    /// - `file` from a single detected `*.sln` when not scanning all projects
    /// - `project_name` as `owner/name` when unset
    /// - `remote_repo_url` from the project name when unset
    pub fn augment_flags(
        &self,
        mut flags: SnykFlags,
        repo_owner: &str,
        repo_name: &str,
    ) -> Result<SnykFlags, ExtensionError> {
        info!(root = %self.root().display(), "detecting sub-projects");

        flags.language = detect_language(self.root(), &flags.exclude_directories);
        flags.sub_projects = detect_sub_projects(self.root(), &flags.exclude_directories)?;

        info!(
            language = %flags.language,
            package_managers = flags.sub_projects.len(),
            sub_projects = flags.sub_project_count(),
            "detected sub-projects"
        );

        if flags.file.is_empty() && !flags.all_projects {
            let solutions: Vec<&PathBuf> = flags
                .sub_projects
                .get(&PackageManager::Nuget)
                .into_iter()
                .flatten()
                .filter(|p| p.extension().is_some_and(|e| e == "sln"))
                .collect();
            if let [solution] = solutions.as_slice() {
                flags.file = solution.display().to_string();
                info!(file = %flags.file, "autodetected file and using it as 'file' parameter");
            }
        }

        if flags.project_name.is_empty() && !repo_owner.is_empty() && !repo_name.is_empty() {
            flags.project_name = format!("{repo_owner}/{repo_name}");
            info!(project_name = %flags.project_name, "automatically set project name");
        }

        if flags.remote_repo_url.is_empty() && !flags.project_name.is_empty() {
            flags.remote_repo_url = flags.project_name.clone();
        }

        Ok(flags)
    }

    /// Prepares every detected package manager, then runs snyk.
    ///
    /// # Errors
    ///
    /// The first preparation failure of a fully supported package manager,
    /// or the first failing snyk command.
    pub async fn run(&self, flags: &SnykFlags) -> Result<RunSummary, ExtensionError> {
        let mut summary = RunSummary {
            language: flags.language,
            sub_projects: flags.sub_project_count(),
            ..Default::default()
        };

        if flags.nothing_detected() {
            info!("could not find supported package manager files, exiting");
            summary.skipped = true;
            return Ok(summary);
        }

        for (pm, paths) in &flags.sub_projects {
            if *pm == PackageManager::Maven {
                self.prepare_maven(flags, paths, &mut summary).await?;
                continue;
            }
            for spec in preparation_commands(*pm, self.root(), paths) {
                self.run_preparation(*pm, spec, &mut summary).await?;
            }
        }

        self.snyk.auth().await?;
        summary.test = self.snyk.test(flags).await?;
        summary.monitor = self.snyk.monitor(flags).await?;

        Ok(summary)
    }

    async fn prepare_maven(
        &self,
        flags: &SnykFlags,
        poms: &[PathBuf],
        summary: &mut RunSummary,
    ) -> Result<(), ExtensionError> {
        let settings_path = &self.options.maven_settings_path;
        let settings_exist = tokio::fs::try_exists(settings_path)
            .await
            .map_err(|e| ExtensionError::io(settings_path, e))?;

        if !settings_exist {
            if let Some(mirror) = self.maven_mirror(flags).await? {
                info!("initializing maven settings");
                if write_maven_settings(
                    settings_path,
                    &self.options.maven_settings_template,
                    &mirror,
                )
                .await?
                {
                    summary
                        .prepared
                        .push(format!("wrote {}", settings_path.display()));
                }
            }
        }

        if let Some(spec) = maven_update_parent_command(self.root(), poms, flags) {
            self.run_preparation(PackageManager::Maven, spec, summary)
                .await?;
        }
        Ok(())
    }

    /// Mirror from flags, else from the injected credential.
    async fn maven_mirror(&self, flags: &SnykFlags) -> Result<Option<MavenMirror>, ExtensionError> {
        if flags.has_maven_mirror() {
            return Ok(Some(MavenMirror {
                url: flags.maven_mirror_url.clone(),
                username: flags.maven_username.clone(),
                password: flags.maven_password.clone(),
            }));
        }

        let credential = self.credentials.get_credential().await?;
        let props = credential.additional_properties;
        if !props.has_maven_mirror() {
            return Ok(None);
        }
        Ok(Some(MavenMirror {
            url: props.maven_mirror_url,
            username: props.maven_username,
            password: props.maven_password,
        }))
    }

    async fn run_preparation(
        &self,
        pm: PackageManager,
        spec: CommandSpec,
        summary: &mut RunSummary,
    ) -> Result<(), ExtensionError> {
        match self.runner.run(&spec).await {
            Ok(()) => {
                summary.prepared.push(spec.to_string());
                Ok(())
            }
            // Cancellation always aborts the run.
            Err(e @ CommandError::Cancelled { .. }) => Err(ExtensionError::Preparation {
                package_manager: pm.to_string(),
                source: e,
            }),
            Err(e) if pm.ignore_errors() => {
                warn!(
                    package_manager = %pm,
                    error = %e,
                    "failed preparing application, ignoring until package manager is fully supported"
                );
                summary.warnings.push(format!("{pm}: {e}"));
                Ok(())
            }
            Err(e) => Err(ExtensionError::Preparation {
                package_manager: pm.to_string(),
                source: e,
            }),
        }
    }
}
