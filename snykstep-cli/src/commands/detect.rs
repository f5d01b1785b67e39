//! `snykstep detect` command handler

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use snykstep_core::config::ExtensionConfig;
use snykstep_core::types::{Language, PackageManager, SubProjects};
use snykstep_extension::{detect_language, detect_sub_projects};

use crate::cli::DetectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `detect` command.
pub fn execute(
    args: DetectArgs,
    config: &ExtensionConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let excludes = args
        .exclude
        .unwrap_or_else(|| config.exclude_directories.clone());

    let language = detect_language(&args.path, &excludes);
    let sub_projects = detect_sub_projects(&args.path, &excludes)?;

    let report = DetectReport::new(args.path.display().to_string(), language, &sub_projects);
    writer.render(&report)
}

#[derive(Debug, Serialize)]
pub struct DetectReport {
    pub path: String,
    pub language: Language,
    pub package_managers: Vec<DetectedManager>,
}

#[derive(Debug, Serialize)]
pub struct DetectedManager {
    pub package_manager: PackageManager,
    pub paths: Vec<String>,
}

impl DetectReport {
    fn new(path: String, language: Language, sub_projects: &SubProjects) -> Self {
        let package_managers = sub_projects
            .iter()
            .map(|(pm, paths)| DetectedManager {
                package_manager: *pm,
                paths: paths.iter().map(|p| p.display().to_string()).collect(),
            })
            .collect();
        Self {
            path,
            language,
            package_managers,
        }
    }
}

impl Render for DetectReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Path: {}", self.path.bold())?;
        writeln!(w, "Language: {}", self.language)?;
        writeln!(w)?;

        if self.package_managers.is_empty() {
            writeln!(w, "{}", "No supported package manager files found.".yellow())?;
            return Ok(());
        }

        for detected in &self.package_managers {
            writeln!(
                w,
                "{} ({})",
                detected.package_manager.to_string().bold(),
                detected.paths.len()
            )?;
            for path in &detected.paths {
                writeln!(w, "  {path}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_report_keeps_package_manager_order() {
        let mut sub_projects = SubProjects::new();
        sub_projects.insert(PackageManager::Docker, vec![PathBuf::from("Dockerfile")]);
        sub_projects.insert(PackageManager::Npm, vec![PathBuf::from("web/package.json")]);

        let report = DetectReport::new(".".to_owned(), Language::Node, &sub_projects);

        assert_eq!(report.package_managers[0].package_manager, PackageManager::Npm);
        assert_eq!(report.package_managers[1].package_manager, PackageManager::Docker);
    }

    #[test]
    fn test_render_text_lists_paths() {
        colored::control::set_override(false);
        let mut sub_projects = SubProjects::new();
        sub_projects.insert(
            PackageManager::Pip,
            vec![PathBuf::from("requirements.txt"), PathBuf::from("setup.py")],
        );
        let report = DetectReport::new("repo".to_owned(), Language::Python, &sub_projects);

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");

        assert!(output.contains("Language: Python"));
        assert!(output.contains("Pip (2)"));
        assert!(output.contains("  setup.py"));
    }

    #[test]
    fn test_render_text_empty() {
        colored::control::set_override(false);
        let report = DetectReport::new("repo".to_owned(), Language::Unknown, &SubProjects::new());

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");

        assert!(output.contains("No supported package manager files found."));
    }
}
