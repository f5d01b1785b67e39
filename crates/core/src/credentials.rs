//! Injected Snyk API token credentials.
//!
//! The CI system mounts a JSON array of credentials at a well-known path.
//! When the file is absent, the same JSON may be injected through the
//! [`CREDENTIALS_ENV_VAR`] environment variable.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::CredentialsError;
use crate::models::ApiTokenCredentials;

/// Default mount path of the injected credentials file.
pub const DEFAULT_TOKEN_PATH: &str = "/credentials/snyk_api_token.json";

/// Environment variable holding the credentials JSON when no file is mounted.
pub const CREDENTIALS_ENV_VAR: &str = "ESTAFETTE_CREDENTIALS_SNYK_API_TOKEN";

/// Source of the Snyk API token.
pub trait CredentialsClient: Send + Sync + 'static {
    /// Returns the first injected credential.
    fn get_credential(
        &self,
    ) -> impl Future<Output = Result<ApiTokenCredentials, CredentialsError>> + Send;

    /// Returns the token of the first injected credential.
    ///
    /// # Errors
    ///
    /// `CredentialsError::EmptyToken` when the token is blank.
    fn get_token(&self) -> impl Future<Output = Result<String, CredentialsError>> + Send {
        async {
            let credential = self.get_credential().await?;
            let token = credential.additional_properties.token;
            if token.trim().is_empty() {
                return Err(CredentialsError::EmptyToken);
            }
            Ok(token)
        }
    }
}

/// Reads credentials from the injected file, falling back to env.
#[derive(Debug, Clone)]
pub struct FileCredentialsClient {
    path: PathBuf,
}

impl FileCredentialsClient {
    /// Creates a client for `path`; on Windows the path is rooted at `C:`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = if cfg!(windows) {
            PathBuf::from(format!("C:{}", path.display()))
        } else {
            path.to_path_buf()
        };
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialsClient for FileCredentialsClient {
    async fn get_credential(&self) -> Result<ApiTokenCredentials, CredentialsError> {
        let content = if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            info!(path = %self.path.display(), "reading credentials from file");
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| CredentialsError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                })?
        } else if let Ok(json) = std::env::var(CREDENTIALS_ENV_VAR) {
            info!(env_key = CREDENTIALS_ENV_VAR, "reading credentials from env");
            json
        } else {
            return Err(CredentialsError::InjectedCredentialsFileMissing {
                path: self.path.display().to_string(),
            });
        };

        parse_credentials(&content)
    }
}

/// Parses the injected credentials array and returns its first element.
pub fn parse_credentials(json: &str) -> Result<ApiTokenCredentials, CredentialsError> {
    let credentials: Vec<ApiTokenCredentials> = serde_json::from_str(json)?;
    credentials
        .into_iter()
        .next()
        .ok_or(CredentialsError::EmptyToken)
}

/// Fixed credentials for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MockCredentialsClient {
    pub credential: Option<ApiTokenCredentials>,
}

#[cfg(test)]
impl CredentialsClient for MockCredentialsClient {
    async fn get_credential(&self) -> Result<ApiTokenCredentials, CredentialsError> {
        self.credential.clone().ok_or(CredentialsError::EmptyToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const VALID: &str = r#"[{"name":"snyk","type":"snyk-api-token","additionalProperties":{"token":"abc"}}]"#;

    #[tokio::test]
    #[serial]
    async fn reads_token_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snyk_api_token.json");
        std::fs::write(&path, VALID).unwrap();

        let client = FileCredentialsClient::new(&path);
        assert_eq!(client.get_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    #[serial]
    async fn missing_file_without_env_is_an_error() {
        // SAFETY: serialised test, no other thread reads this var concurrently
        unsafe { std::env::remove_var(CREDENTIALS_ENV_VAR) };

        let client = FileCredentialsClient::new("/nonexistent/snyk_api_token.json");
        let err = client.get_credential().await.unwrap_err();
        assert!(matches!(
            err,
            CredentialsError::InjectedCredentialsFileMissing { .. }
        ));
    }

    #[tokio::test]
    #[serial]
    async fn missing_file_falls_back_to_env() {
        // SAFETY: serialised test, no other thread reads this var concurrently
        unsafe { std::env::set_var(CREDENTIALS_ENV_VAR, VALID) };

        let client = FileCredentialsClient::new("/nonexistent/snyk_api_token.json");
        let token = client.get_token().await;

        // SAFETY: see above
        unsafe { std::env::remove_var(CREDENTIALS_ENV_VAR) };
        assert_eq!(token.unwrap(), "abc");
    }

    #[tokio::test]
    #[serial]
    async fn empty_array_is_empty_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snyk_api_token.json");
        std::fs::write(&path, "[]").unwrap();

        let client = FileCredentialsClient::new(&path);
        let err = client.get_credential().await.unwrap_err();
        assert!(matches!(err, CredentialsError::EmptyToken));
    }

    #[tokio::test]
    #[serial]
    async fn blank_token_is_empty_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snyk_api_token.json");
        std::fs::write(&path, r#"[{"additionalProperties":{"token":""}}]"#).unwrap();

        let client = FileCredentialsClient::new(&path);
        let err = client.get_token().await.unwrap_err();
        assert!(matches!(err, CredentialsError::EmptyToken));
    }

    #[tokio::test]
    #[serial]
    async fn malformed_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snyk_api_token.json");
        std::fs::write(&path, "{not json").unwrap();

        let client = FileCredentialsClient::new(&path);
        let err = client.get_credential().await.unwrap_err();
        assert!(matches!(err, CredentialsError::Parse(_)));
    }

    #[test]
    fn parse_credentials_takes_first_entry() {
        let json = r#"[
            {"name":"first","additionalProperties":{"token":"one"}},
            {"name":"second","additionalProperties":{"token":"two"}}
        ]"#;
        let credential = parse_credentials(json).unwrap();
        assert_eq!(credential.name, "first");
        assert_eq!(credential.additional_properties.token, "one");
    }

    #[tokio::test]
    async fn mock_client_uses_default_get_token() {
        let client = MockCredentialsClient {
            credential: Some(parse_credentials(VALID).unwrap()),
        };
        assert_eq!(client.get_token().await.unwrap(), "abc");
    }

    #[cfg(unix)]
    #[test]
    fn path_is_kept_verbatim_on_unix() {
        let client = FileCredentialsClient::new(DEFAULT_TOKEN_PATH);
        assert_eq!(client.path(), Path::new(DEFAULT_TOKEN_PATH));
    }
}
