//! Sub-project and language detection.
//!
//! A single recursive walk of the checkout, pruned at excluded directory
//! names, matching each file's name against the marker patterns of every
//! [`PackageManager`].
//!
//! ```text
//! repo/
//! ├── go.mod                 -> GoModules
//! ├── web/package.json       -> Npm
//! ├── node_modules/...       (excluded, not entered)
//! └── Dockerfile.build       -> Docker
//! ```

use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use snykstep_core::types::{Language, PackageManager, SubProjects};

use crate::error::ExtensionError;

/// Finds files under `root` whose name matches any of `patterns`.
///
/// Directories named in `excludes` are not entered. Returned paths are
/// relative to `root` and sorted.
///
/// # Errors
///
/// - `ExtensionError::Pattern` if a pattern is not a valid glob
/// - `ExtensionError::Io` if `root` cannot be read
pub fn find_file_matches<P, E>(
    root: &Path,
    patterns: &[P],
    excludes: &[E],
) -> Result<Vec<PathBuf>, ExtensionError>
where
    P: AsRef<str>,
    E: AsRef<str>,
{
    let set = build_glob_set(patterns)?;
    let mut matches: Vec<PathBuf> = walk_files(root, excludes)?
        .filter(|entry| set.is_match(entry.file_name()))
        .map(|entry| relative_to(root, entry.path()))
        .collect();
    matches.sort();
    Ok(matches)
}

/// Detects sub-projects of every known package manager under `root`.
///
/// Only package managers with at least one matching file appear in the map.
pub fn detect_sub_projects<E: AsRef<str>>(
    root: &Path,
    excludes: &[E],
) -> Result<SubProjects, ExtensionError> {
    let mut matchers: Vec<(PackageManager, GlobSet)> = Vec::new();
    for pm in PackageManager::ALL {
        match build_glob_set(pm.marker_patterns()) {
            Ok(set) => matchers.push((pm, set)),
            Err(e) => warn!(package_manager = %pm, error = %e, "skipping package manager"),
        }
    }

    let mut detected = SubProjects::new();
    for entry in walk_files(root, excludes)? {
        for (pm, set) in &matchers {
            if set.is_match(entry.file_name()) {
                let path = relative_to(root, entry.path());
                debug!(package_manager = %pm, path = %path.display(), "detected sub-project");
                detected.entry(*pm).or_default().push(path);
            }
        }
    }

    for paths in detected.values_mut() {
        paths.sort();
    }
    Ok(detected)
}

/// Detects the primary language of the checkout.
///
/// Checked in priority order: `go.mod`, `package.json`, `pom.xml` at the
/// root, any `*.sln` below it, then a root `requirements.txt`.
pub fn detect_language<E: AsRef<str>>(root: &Path, excludes: &[E]) -> Language {
    if root.join("go.mod").is_file() {
        return Language::Golang;
    }
    if root.join("package.json").is_file() {
        return Language::Node;
    }
    if root.join("pom.xml").is_file() {
        return Language::Maven;
    }
    match find_file_matches(root, &["*.sln"], excludes) {
        Ok(solutions) if !solutions.is_empty() => return Language::Dotnet,
        Ok(_) => {}
        Err(e) => warn!(error = %e, "failed searching for solution files"),
    }
    if root.join("requirements.txt").is_file() {
        return Language::Python;
    }
    Language::Unknown
}

fn build_glob_set<P: AsRef<str>>(patterns: &[P]) -> Result<GlobSet, ExtensionError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile(pattern.as_ref())?);
    }
    builder.build().map_err(|e| ExtensionError::Pattern {
        pattern: patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(","),
        source: e,
    })
}

fn compile(pattern: &str) -> Result<Glob, ExtensionError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| ExtensionError::Pattern {
            pattern: pattern.to_owned(),
            source: e,
        })
}

/// Regular files under `root`, not descending into excluded directories.
fn walk_files<'a, E: AsRef<str>>(
    root: &Path,
    excludes: &'a [E],
) -> Result<impl Iterator<Item = DirEntry> + 'a, ExtensionError> {
    // Surface an unreadable root instead of silently finding nothing.
    std::fs::read_dir(root).map_err(|e| ExtensionError::io(root, e))?;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| entry.depth() == 0 || !is_excluded_dir(entry, excludes));

    Ok(walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "failed to read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file()))
}

fn is_excluded_dir<E: AsRef<str>>(entry: &DirEntry, excludes: &[E]) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.iter().any(|e| e.as_ref() == name))
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
