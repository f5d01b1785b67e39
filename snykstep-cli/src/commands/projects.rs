//! `snykstep projects` command handler

use std::io::Write;

use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info};

use snykstep_core::config::ExtensionConfig;
use snykstep_core::credentials::{CredentialsClient, FileCredentialsClient};
use snykstep_core::models::{Organization, Project, ProjectFilters};
use snykstep_core::types::Severity;
use snykstep_snyk_api::{HttpSnykApiClient, SnykApi, SnykApiConfig};

use crate::cli::ProjectsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `projects` command.
pub async fn execute(
    args: ProjectsArgs,
    config: &ExtensionConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let token = FileCredentialsClient::new(&config.snyk_api_token_path)
        .get_token()
        .await?;
    let client = HttpSnykApiClient::with_config(
        token,
        SnykApiConfig {
            base_url: args.api_url.clone(),
            ..Default::default()
        },
    )?;

    let report = collect(&client, args.org.as_deref(), args.issues).await?;
    writer.render(&report)
}

/// Walks organizations and their projects.
pub async fn collect<A: SnykApi>(
    api: &A,
    org_filter: Option<&str>,
    with_issues: bool,
) -> Result<ProjectsReport, CliError> {
    let orgs: Vec<Organization> = api
        .get_organizations()
        .await?
        .into_iter()
        .filter(|org| org_filter.is_none_or(|f| org.id == f || org.slug == f || org.name == f))
        .collect();
    info!(organizations = orgs.len(), "listing snyk projects");

    let mut organizations = Vec::with_capacity(orgs.len());
    for org in orgs {
        let projects = api.get_projects(&org.id).await?;
        debug!(org = %org.id, projects = projects.len(), "fetched projects");

        let mut entries = Vec::with_capacity(projects.len());
        for project in projects {
            let vulnerabilities = if with_issues {
                let issues = api
                    .get_project_issues(&org.id, &project.id, &ProjectFilters::default())
                    .await?;
                Some(issues.issues.vulnerabilities.len())
            } else {
                None
            };
            entries.push(ProjectEntry::new(project, vulnerabilities));
        }

        organizations.push(OrganizationEntry {
            id: org.id,
            name: org.name,
            projects: entries,
        });
    }

    Ok(ProjectsReport { organizations })
}

#[derive(Debug, Serialize)]
pub struct ProjectsReport {
    pub organizations: Vec<OrganizationEntry>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationEntry {
    pub id: String,
    pub name: String,
    pub projects: Vec<ProjectEntry>,
}

#[derive(Debug, Serialize)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_vulnerabilities: Option<usize>,
}

impl ProjectEntry {
    fn new(project: Project, open_vulnerabilities: Option<usize>) -> Self {
        let count = |s: Severity| {
            project
                .issue_counts_by_severity
                .get(&s)
                .copied()
                .unwrap_or(0)
        };
        Self {
            critical: count(Severity::Critical),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            id: project.id,
            name: project.name,
            kind: project.kind,
            open_vulnerabilities,
        }
    }
}

impl Render for ProjectsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.organizations.is_empty() {
            writeln!(w, "{}", "No organizations found.".yellow())?;
            return Ok(());
        }

        for org in &self.organizations {
            writeln!(w, "Organization: {} ({})", org.name.bold(), org.id)?;
            if org.projects.is_empty() {
                writeln!(w, "  no projects")?;
                writeln!(w)?;
                continue;
            }

            writeln!(
                w,
                "  {:<50} {:<12} {:>4} {:>4} {:>4} {:>4}",
                "Project", "Type", "C", "H", "M", "L"
            )?;
            writeln!(w, "  {}", "-".repeat(82))?;
            for p in &org.projects {
                let high = format!("{:>4}", p.high);
                let high = if p.critical + p.high > 0 {
                    high.red()
                } else {
                    high.normal()
                };
                write!(
                    w,
                    "  {:<50} {:<12} {:>4} {} {:>4} {:>4}",
                    p.name, p.kind, p.critical, high, p.medium, p.low
                )?;
                match p.open_vulnerabilities {
                    Some(n) => writeln!(w, "  open: {n}")?,
                    None => writeln!(w)?,
                }
            }
            writeln!(w)?;
        }
        Ok(())
    }
}
