//! Snyk v1 REST API client.
//!
//! [`SnykApi`] abstracts the few endpoints the extension reads;
//! [`HttpSnykApiClient`] implements it over `reqwest` with a bounded retry
//! loop.
//!
//! # Retry policy
//!
//! Transport errors, timeouts, `429` and `5xx` responses are retried up to
//! `max_retries` times with exponential backoff (`base`, `2 * base`,
//! `4 * base`, ...). Any other status outside `allowed_status` fails
//! immediately.

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use snykstep_core::models::{Organization, Project, ProjectFilters, ProjectIssues};

use crate::error::SnykApiError;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://snyk.io/api/v1";

/// Operations on the Snyk REST API.
pub trait SnykApi: Send + Sync + 'static {
    /// Lists the organizations the token has access to.
    fn get_organizations(
        &self,
    ) -> impl Future<Output = Result<Vec<Organization>, SnykApiError>> + Send;

    /// Lists the projects of an organization.
    fn get_projects(
        &self,
        org_id: &str,
    ) -> impl Future<Output = Result<Vec<Project>, SnykApiError>> + Send;

    /// Fetches the issues of a project matching `filters`.
    fn get_project_issues(
        &self,
        org_id: &str,
        project_id: &str,
        filters: &ProjectFilters,
    ) -> impl Future<Output = Result<ProjectIssues, SnykApiError>> + Send;
}

/// Connection and retry settings.
#[derive(Debug, Clone)]
pub struct SnykApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff_base: Duration,
    /// Status codes treated as success
    pub allowed_status: Vec<u16>,
}

impl Default for SnykApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff_base: Duration::from_millis(100),
            allowed_status: vec![200],
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrganizationsResponse {
    #[serde(default)]
    orgs: Vec<Organization>,
}

#[derive(Deserialize)]
struct ProjectsResponse {
    #[serde(default)]
    projects: Vec<Project>,
}

/// [`SnykApi`] over HTTPS.
pub struct HttpSnykApiClient {
    client: reqwest::Client,
    token: String,
    config: SnykApiConfig,
}

impl HttpSnykApiClient {
    /// Creates a client against the public API with default settings.
    pub fn new(token: impl Into<String>) -> Result<Self, SnykApiError> {
        Self::with_config(token, SnykApiConfig::default())
    }

    pub fn with_config(
        token: impl Into<String>,
        config: SnykApiConfig,
    ) -> Result<Self, SnykApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(SnykApiError::ClientBuild)?;
        Ok(Self {
            client,
            token: token.into(),
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SnykApiError> {
        let url = self.url(path);
        let body = self.execute_with_retry(Method::GET, &url, None).await?;
        decode(&url, &body)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<T, SnykApiError> {
        let url = self.url(path);
        let body = self
            .execute_with_retry(Method::POST, &url, Some(&payload))
            .await?;
        decode(&url, &body)
    }

    async fn execute_with_retry(
        &self,
        method: Method,
        url: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<String, SnykApiError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.retry_backoff_base * 2u32.saturating_pow(attempt - 1);
                warn!(
                    method = %method,
                    url,
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "retrying snyk api request"
                );
                tokio::time::sleep(backoff).await;
            }

            match tokio::time::timeout(
                self.config.request_timeout,
                self.execute_once(method.clone(), url, payload),
            )
            .await
            {
                Ok(Ok(body)) => return Ok(body),
                Ok(Err(e)) if e.is_retryable() => last_error = Some(e),
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => {
                    last_error = Some(SnykApiError::Timeout {
                        method: method.to_string(),
                        url: url.to_owned(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SnykApiError::Timeout {
            method: method.to_string(),
            url: url.to_owned(),
        }))
    }

    async fn execute_once(
        &self,
        method: Method,
        url: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<String, SnykApiError> {
        let http_error = |source| SnykApiError::Http {
            method: method.to_string(),
            url: url.to_owned(),
            source,
        };

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(AUTHORIZATION, format!("token {}", self.token));
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(http_error)?;
        let status = response.status().as_u16();
        debug!(method = %method, url, status, "snyk api responded");

        if !self.config.allowed_status.contains(&status) {
            return Err(SnykApiError::UnexpectedStatus {
                method: method.to_string(),
                url: url.to_owned(),
                status,
            });
        }

        response.text().await.map_err(http_error)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, SnykApiError> {
    serde_json::from_str(body).map_err(|e| SnykApiError::Decode {
        url: url.to_owned(),
        source: e,
    })
}

impl SnykApi for HttpSnykApiClient {
    async fn get_organizations(&self) -> Result<Vec<Organization>, SnykApiError> {
        let response: OrganizationsResponse = self.get_json("orgs").await?;
        Ok(response.orgs)
    }

    async fn get_projects(&self, org_id: &str) -> Result<Vec<Project>, SnykApiError> {
        let response: ProjectsResponse = self.get_json(&format!("org/{org_id}/projects")).await?;
        Ok(response.projects)
    }

    async fn get_project_issues(
        &self,
        org_id: &str,
        project_id: &str,
        filters: &ProjectFilters,
    ) -> Result<ProjectIssues, SnykApiError> {
        let payload = serde_json::json!({ "filters": filters });
        self.post_json(&format!("org/{org_id}/project/{project_id}/issues"), payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_public_api() {
        let config = SnykApiConfig::default();
        assert_eq!(config.base_url, "https://snyk.io/api/v1");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.allowed_status, vec![200]);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = HttpSnykApiClient::with_config(
            "tok",
            SnykApiConfig {
                base_url: "http://127.0.0.1:8080/api/v1/".to_owned(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(client.url("orgs"), "http://127.0.0.1:8080/api/v1/orgs");
    }

    #[test]
    fn decode_reports_url() {
        let err = decode::<OrganizationsResponse>("http://x/orgs", "{oops").unwrap_err();
        assert!(matches!(err, SnykApiError::Decode { .. }));
        assert!(err.to_string().contains("http://x/orgs"));
    }

    #[test]
    fn organizations_response_tolerates_missing_list() {
        let response: OrganizationsResponse = decode("http://x/orgs", "{}").unwrap();
        assert!(response.orgs.is_empty());
    }
}
