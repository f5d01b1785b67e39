//! Package manager preparation.
//!
//! Some snyk plugins need dependencies resolved before they can build a
//! dependency graph. The commands here are planned as [`CommandSpec`]s and
//! executed by the service, which applies the error policy of
//! [`PackageManager::ignore_errors`].

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use snykstep_core::runner::CommandSpec;
use snykstep_core::types::{PackageManager, SnykFlags};

use crate::error::ExtensionError;

/// Lock files that make `npm install` unnecessary.
const NPM_LOCKFILES: [&str; 3] = ["package-lock.json", "npm-shrinkwrap.json", "yarn.lock"];

/// Settings template used when no template file is mounted.
pub const DEFAULT_MAVEN_SETTINGS_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<settings xmlns="http://maven.apache.org/SETTINGS/1.0.0"
          xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
          xsi:schemaLocation="http://maven.apache.org/SETTINGS/1.0.0 https://maven.apache.org/xsd/settings-1.0.0.xsd">
  <mirrors>
    <mirror>
      <id>mirror</id>
      <mirrorOf>*</mirrorOf>
      <url>{{.MirrorUrl}}</url>
    </mirror>
  </mirrors>
  <servers>
    <server>
      <id>mirror</id>
      <username>{{.Username}}</username>
      <password>{{.Password}}</password>
    </server>
  </servers>
</settings>
"#;

/// Maven mirror credentials rendered into `settings.xml`.
#[derive(Clone, PartialEq, Eq)]
pub struct MavenMirror {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for MavenMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MavenMirror")
            .field("url", &self.url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Renders a settings template, XML-escaping every substituted value.
pub fn render_maven_settings(template: &str, mirror: &MavenMirror) -> String {
    template
        .replace("{{.MirrorUrl}}", &escape_xml(&mirror.url))
        .replace("{{.Username}}", &escape_xml(&mirror.username))
        .replace("{{.Password}}", &escape_xml(&mirror.password))
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Writes the maven settings file unless it already exists.
///
/// Returns `false` when an existing file was left untouched.
pub async fn write_maven_settings(
    settings_path: &Path,
    template_path: &Path,
    mirror: &MavenMirror,
) -> Result<bool, ExtensionError> {
    if tokio::fs::try_exists(settings_path)
        .await
        .map_err(|e| ExtensionError::io(settings_path, e))?
    {
        debug!(path = %settings_path.display(), "maven settings already present");
        return Ok(false);
    }

    let template = match tokio::fs::read_to_string(template_path).await {
        Ok(template) => template,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %template_path.display(), "no settings template mounted, using default");
            DEFAULT_MAVEN_SETTINGS_TEMPLATE.to_owned()
        }
        Err(e) => return Err(ExtensionError::io(template_path, e)),
    };

    if let Some(parent) = settings_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExtensionError::io(parent, e))?;
    }

    info!(
        path = %settings_path.display(),
        url = %mirror.url,
        username = %mirror.username,
        "generating maven settings"
    );
    tokio::fs::write(settings_path, render_maven_settings(&template, mirror))
        .await
        .map_err(|e| ExtensionError::io(settings_path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(settings_path, std::fs::Permissions::from_mode(0o644))
            .await
            .map_err(|e| ExtensionError::io(settings_path, e))?;
    }

    Ok(true)
}

/// `mvn versions:update-parent` pinned to the build's major.minor line.
///
/// Runs in the directory of the shallowest `pom.xml`. `None` unless
/// `maven_update_parent` is set and both version parts are known.
pub fn maven_update_parent_command(
    root: &Path,
    poms: &[PathBuf],
    flags: &SnykFlags,
) -> Option<CommandSpec> {
    if !flags.maven_update_parent
        || flags.build_version_major.is_empty()
        || flags.build_version_minor.is_empty()
    {
        return None;
    }
    let pom = poms.iter().min_by_key(|p| p.components().count())?;
    Some(
        CommandSpec::new("mvn")
            .arg(format!(
                "-DparentVersion=[0.0.0,{}.{}.9999]",
                flags.build_version_major, flags.build_version_minor
            ))
            .arg("versions:update-parent")
            .current_dir(project_dir(root, pom)),
    )
}

/// Commands preparing `pm` for the given sub-project paths.
///
/// Maven is handled by [`write_maven_settings`] and
/// [`maven_update_parent_command`]; GoModules and Docker need nothing.
pub fn preparation_commands(pm: PackageManager, root: &Path, paths: &[PathBuf]) -> Vec<CommandSpec> {
    match pm {
        PackageManager::Npm => paths
            .iter()
            .map(|p| project_dir(root, p))
            .filter(|dir| {
                let locked = NPM_LOCKFILES.iter().any(|l| dir.join(l).is_file());
                if locked {
                    debug!(dir = %dir.display(), "lockfile present, skipping npm install");
                }
                !locked
            })
            .map(|dir| CommandSpec::new("npm").arg("install").current_dir(dir))
            .collect(),
        PackageManager::Nuget => paths
            .iter()
            .map(|p| {
                CommandSpec::new("dotnet")
                    .args(["restore", "--packages", ".nuget/packages"])
                    .arg(p.display().to_string())
                    .current_dir(root)
            })
            .collect(),
        PackageManager::Pip => paths
            .iter()
            .filter(|p| p.file_name().is_some_and(|n| n == "requirements.txt"))
            .map(|p| {
                CommandSpec::new("pip")
                    .arg("install")
                    .arg("-r")
                    .arg(p.display().to_string())
                    .current_dir(root)
            })
            .collect(),
        PackageManager::Maven
        | PackageManager::GoModules
        | PackageManager::Docker
        | PackageManager::Unknown => Vec::new(),
    }
}

fn project_dir(root: &Path, marker: &Path) -> PathBuf {
    match marker.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
        _ => root.to_path_buf(),
    }
}
