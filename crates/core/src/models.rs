//! Snyk v1 API and injected-credential JSON models.
//!
//! Field names are camelCase on the wire. Optional values are skipped when
//! empty so that re-serialized payloads stay minimal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Severity;

/// One entry of the injected credentials array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenCredentials {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub additional_properties: ApiTokenCredentialsAdditionalProperties,
}

/// Token plus the optional maven mirror the credential may carry.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenCredentialsAdditionalProperties {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub maven_mirror_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub maven_username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub maven_password: String,
}

impl ApiTokenCredentialsAdditionalProperties {
    /// Whether the credential carries a complete maven mirror triple.
    pub fn has_maven_mirror(&self) -> bool {
        !self.maven_mirror_url.is_empty()
            && !self.maven_username.is_empty()
            && !self.maven_password.is_empty()
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for ApiTokenCredentialsAdditionalProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTokenCredentialsAdditionalProperties")
            .field("token", &redact(&self.token))
            .field("maven_mirror_url", &self.maven_mirror_url)
            .field("maven_username", &self.maven_username)
            .field("maven_password", &redact(&self.maven_password))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "***" }
}

/// Snyk organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

/// Group an organization belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
}

/// A project Snyk monitors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_repo_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_tested_date: String,
    #[serde(default)]
    pub total_dependencies: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub issue_counts_by_severity: BTreeMap<Severity, u64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl Project {
    /// Number of issues at or above `threshold`.
    pub fn issue_count_at_least(&self, threshold: Severity) -> u64 {
        self.issue_counts_by_severity
            .iter()
            .filter(|(severity, _)| **severity >= threshold)
            .map(|(_, count)| count)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// CVE/CWE identifiers attached to a vulnerability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identifiers {
    #[serde(default, rename = "CVE")]
    pub cve: Vec<String>,
    #[serde(default, rename = "CWE")]
    pub cwe: Vec<String>,
}

/// A vulnerability reported for a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub from: Vec<String>,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub package_manager: String,
    #[serde(default)]
    pub is_upgradable: bool,
    #[serde(default)]
    pub is_patchable: bool,
    #[serde(default)]
    pub is_pinnable: bool,
    #[serde(default)]
    pub cvss_score: Option<f64>,
    #[serde(default)]
    pub identifiers: Identifiers,
}

/// Issues grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issues {
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub licenses: Vec<serde_json::Value>,
}

/// Response of the project issues endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIssues {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub issues: Issues,
    #[serde(default)]
    pub dependency_count: u64,
    #[serde(default)]
    pub package_manager: String,
}

/// Request body filter for the project issues endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFilters {
    pub severities: Vec<Severity>,
    pub types: Vec<String>,
    pub ignored: bool,
    pub patched: bool,
}

impl Default for ProjectFilters {
    fn default() -> Self {
        Self {
            severities: vec![Severity::High, Severity::Medium, Severity::Low],
            types: vec!["vuln".to_owned(), "license".to_owned()],
            ignored: false,
            patched: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_parse_from_injected_array() {
        let json = r#"[{
            "name": "snyk-api-token",
            "type": "snyk-api-token",
            "additionalProperties": {
                "token": "abc",
                "mavenMirrorUrl": "https://nexus/repo",
                "mavenUsername": "ci",
                "mavenPassword": "pw"
            }
        }]"#;
        let creds: Vec<ApiTokenCredentials> = serde_json::from_str(json).unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].kind, "snyk-api-token");
        assert_eq!(creds[0].additional_properties.token, "abc");
        assert!(creds[0].additional_properties.has_maven_mirror());
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let props = ApiTokenCredentialsAdditionalProperties {
            token: "abc".to_owned(),
            maven_password: "pw".to_owned(),
            ..Default::default()
        };
        let debug = format!("{props:?}");
        assert!(!debug.contains("abc"));
        assert!(!debug.contains("\"pw\""));
        assert!(debug.contains("***"));
    }

    #[test]
    fn project_parses_issue_counts() {
        let json = r#"{
            "name": "estafette/estafette-ci-api",
            "id": "6d5813be-7e6d-4ab8-80c2-1e3e2a454545",
            "remoteRepoUrl": "estafette/estafette-ci-api",
            "totalDependencies": 438,
            "issueCountsBySeverity": {"low": 8, "high": 13, "medium": 15},
            "type": "gomodules",
            "tags": [{"key": "team", "value": "ci"}]
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.kind, "gomodules");
        assert_eq!(project.total_dependencies, 438);
        assert_eq!(project.issue_counts_by_severity[&Severity::High], 13);
        assert_eq!(project.issue_count_at_least(Severity::Medium), 28);
        assert_eq!(project.tags[0].value, "ci");
    }

    #[test]
    fn default_filters_match_api_expectations() {
        let json = serde_json::to_value(ProjectFilters::default()).unwrap();
        assert_eq!(json["severities"], serde_json::json!(["high", "medium", "low"]));
        assert_eq!(json["types"], serde_json::json!(["vuln", "license"]));
        assert_eq!(json["ignored"], false);
        assert_eq!(json["patched"], false);
    }

    #[test]
    fn project_issues_tolerate_missing_fields() {
        let issues: ProjectIssues = serde_json::from_str(r#"{"ok": false}"#).unwrap();
        assert!(!issues.ok);
        assert!(issues.issues.vulnerabilities.is_empty());
    }

    #[test]
    fn vulnerability_parses_flags() {
        let json = r#"{
            "id": "npm:lodash:20180130",
            "title": "Prototype Pollution",
            "severity": "medium",
            "package": "lodash",
            "version": "4.17.4",
            "packageManager": "npm",
            "isUpgradable": true,
            "cvssScore": 6.3,
            "identifiers": {"CVE": ["CVE-2018-3721"], "CWE": ["CWE-471"]}
        }"#;
        let vuln: Vulnerability = serde_json::from_str(json).unwrap();
        assert_eq!(vuln.severity, Severity::Medium);
        assert!(vuln.is_upgradable);
        assert!(!vuln.is_patchable);
        assert_eq!(vuln.identifiers.cve, vec!["CVE-2018-3721".to_owned()]);
    }
}
