//! `snykstep run` command handler

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use snykstep_core::config::ExtensionConfig;
use snykstep_core::credentials::{CredentialsClient, FileCredentialsClient};
use snykstep_core::runner::ProcessRunner;
use snykstep_extension::{ExtensionService, RunSummary, ServiceOptions};
use snykstep_snyk_cli::{ProcessSnykCli, ScanOutcome};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Applies `run` flags on top of the environment configuration.
pub fn apply_overrides(config: &mut ExtensionConfig, args: &RunArgs) {
    let overrides = [
        (&mut config.snyk_api_token_path, &args.credentials_path),
        (&mut config.fail_on, &args.fail_on),
        (&mut config.severity_threshold, &args.severity_threshold),
        (&mut config.file, &args.file),
        (&mut config.project_name, &args.project_name),
        (&mut config.container_image, &args.container_image),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            *field = value.clone();
        }
    }
    config.scan_iac |= args.scan_iac;
    config.debug |= args.debug;
}

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config: &ExtensionConfig,
    cancel: CancellationToken,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let credentials = Arc::new(FileCredentialsClient::new(&config.snyk_api_token_path));
    let token = credentials.get_token().await?;

    let runner = Arc::new(ProcessRunner::new(cancel));
    let snyk = ProcessSnykCli::new(token, Arc::clone(&runner))
        .with_binary(args.snyk_binary)
        .with_current_dir(&args.dir);
    let options = ServiceOptions::from_config(config).with_root(&args.dir);
    let service = ExtensionService::new(credentials, runner, snyk, options);

    let flags = service.augment_flags(config.to_flags()?, &config.repo_owner, &config.repo_name)?;
    info!(
        project_name = %flags.project_name,
        all_projects = flags.all_projects,
        "starting snyk step"
    );

    let summary = service.run(&flags).await?;
    writer.render(&summary)?;
    Ok(())
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.skipped {
            writeln!(
                w,
                "{}",
                "No supported package manager files found, nothing scanned.".yellow()
            )?;
            return Ok(());
        }

        writeln!(w, "Language: {}", self.language.to_string().bold())?;
        writeln!(w, "Sub-projects: {}", self.sub_projects)?;

        if !self.prepared.is_empty() {
            writeln!(w)?;
            writeln!(w, "Prepared:")?;
            for step in &self.prepared {
                writeln!(w, "  {step}")?;
            }
        }
        if !self.warnings.is_empty() {
            writeln!(w)?;
            writeln!(w, "Ignored preparation failures:")?;
            for warning in &self.warnings {
                writeln!(w, "  {}", warning.yellow())?;
            }
        }

        writeln!(w)?;
        writeln!(w, "{:<8} {:<12} Outcome", "Step", "Scan")?;
        writeln!(w, "{}", "-".repeat(44))?;
        let runs = self
            .test
            .iter()
            .map(|r| ("test", r))
            .chain(self.monitor.iter().map(|r| ("monitor", r)));
        for (step, run) in runs {
            let outcome = match run.outcome {
                ScanOutcome::NoIssues => "no issues".green(),
                ScanOutcome::NoSupportedProjects => "no supported projects".yellow(),
            };
            writeln!(w, "{:<8} {:<12} {}", step, run.kind.to_string(), outcome)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use snykstep_core::types::Language;
    use snykstep_snyk_cli::{ScanKind, ScanRun};

    use super::*;

    fn render(summary: &RunSummary) -> String {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        summary.render_text(&mut buffer).expect("should render");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_apply_overrides_only_replaces_given_values() {
        let mut config = ExtensionConfig::default();
        let args = RunArgs {
            fail_on: Some("patchable".to_owned()),
            container_image: Some("estafette/api:1.2.3".to_owned()),
            scan_iac: true,
            ..Default::default()
        };

        apply_overrides(&mut config, &args);

        assert_eq!(config.fail_on, "patchable");
        assert_eq!(config.container_image, "estafette/api:1.2.3");
        assert_eq!(config.severity_threshold, "high", "untouched default");
        assert!(config.scan_iac);
        assert!(!config.debug);
    }

    #[test]
    fn test_apply_overrides_keeps_env_enabled_booleans() {
        let mut config = ExtensionConfig {
            debug: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &RunArgs::default());
        assert!(config.debug, "absent flag must not disable env setting");
    }

    #[test]
    fn test_render_skipped_summary() {
        let output = render(&RunSummary {
            skipped: true,
            ..Default::default()
        });
        assert!(output.contains("nothing scanned"));
        assert!(!output.contains("Outcome"));
    }

    #[test]
    fn test_render_completed_summary() {
        let output = render(&RunSummary {
            language: Language::Node,
            sub_projects: 2,
            prepared: vec!["npm install".to_owned()],
            warnings: vec!["Nuget: 'dotnet restore' exited with code 1".to_owned()],
            test: vec![
                ScanRun {
                    kind: ScanKind::OpenSource,
                    outcome: ScanOutcome::NoIssues,
                },
                ScanRun {
                    kind: ScanKind::Iac,
                    outcome: ScanOutcome::NoSupportedProjects,
                },
            ],
            monitor: vec![ScanRun {
                kind: ScanKind::OpenSource,
                outcome: ScanOutcome::NoIssues,
            }],
            ..Default::default()
        });

        assert!(output.contains("Sub-projects: 2"));
        assert!(output.contains("  npm install"));
        assert!(output.contains("dotnet restore"));
        assert!(output.contains("iac"));
        assert!(output.contains("no supported projects"));
        assert_eq!(output.matches("open-source").count(), 2);
    }
}
