//! OAuth for the YouTube Data API.
//!
//! A cached token is reused while fresh and refreshed when it has expired.
//! With no usable token the device-authorization flow runs against the client
//! in `credentials.json`, and the resulting token is written back.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AuditConfig;
use crate::constants::{oauth, HTTP_TIMEOUT_SECS};
use crate::error::AuditError;

const CREDENTIALS_REMEDIATION: &str = "Create an OAuth client ID of type \
\"TVs and Limited Input devices\" in the Google Cloud Console (APIs & Services > \
Credentials) for a project with the YouTube Data API v3 enabled, download the \
JSON and save it as credentials.json in the working directory.";

/// OAuth client as found in a downloaded client-secrets file
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    oauth::TOKEN_URL.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    #[serde(default)]
    installed: Option<ClientSecrets>,
    #[serde(default)]
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuditError::MissingInput {
                    what: "OAuth credentials file",
                    path: path.to_path_buf(),
                    remediation: CREDENTIALS_REMEDIATION.to_string(),
                });
            }
            Err(source) => {
                return Err(AuditError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&content, path)
    }

    fn from_json(content: &str, path: &Path) -> Result<Self, AuditError> {
        let file: ClientSecretsFile =
            serde_json::from_str(content).map_err(|source| AuditError::MalformedInput {
                path: path.to_path_buf(),
                source,
            })?;
        file.installed.or(file.web).ok_or_else(|| {
            AuditError::Auth(format!(
                "{} has neither an \"installed\" nor a \"web\" client",
                path.display()
            ))
        })
    }
}

/// Token persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: i64,
}

impl StoredToken {
    /// Usable for at least the expiry skew from `now` (unix seconds)
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expires_at - oauth::EXPIRY_SKEW_SECS > now
    }

    pub fn load(path: &Path) -> Option<Self> {
        let contents = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Ignoring unreadable token file {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) {
        let result = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("Failed to save token to {}: {}", path.display(), e);
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    #[serde(alias = "verification_uri")]
    verification_url: String,
    expires_in: u64,
    #[serde(default = "default_poll_interval")]
    interval: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl TokenResponse {
    /// Turn a token endpoint answer into a stored token, keeping the previous
    /// refresh token when the endpoint does not issue a new one
    fn into_stored(self, previous_refresh: Option<String>, now: i64) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: now + self.expires_in.unwrap_or(3600),
        }
    }
}

pub struct Authenticator {
    credentials_path: PathBuf,
    token_path: PathBuf,
    client: reqwest::Client,
}

impl Authenticator {
    pub fn new(config: &AuditConfig) -> Result<Self, AuditError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuditError::Unexpected(e.into()))?;
        Ok(Self {
            credentials_path: config.credentials_path.clone(),
            token_path: config.token_path.clone(),
            client,
        })
    }

    /// A valid access token, authorizing interactively if needed
    pub async fn access_token(&self) -> Result<String, AuditError> {
        let cached = StoredToken::load(&self.token_path);

        if let Some(token) = &cached {
            if token.is_fresh(now_secs()) {
                return Ok(token.access_token.clone());
            }
        }

        let secrets = ClientSecrets::load(&self.credentials_path)?;

        if let Some(refresh_token) = cached.and_then(|t| t.refresh_token) {
            match self.refresh(&secrets, &refresh_token).await {
                Ok(token) => {
                    token.save(&self.token_path);
                    return Ok(token.access_token);
                }
                Err(e) => warn!("Token refresh failed, authorizing again: {}", e),
            }
        }

        let token = self.device_flow(&secrets).await?;
        token.save(&self.token_path);
        Ok(token.access_token)
    }

    async fn refresh(
        &self,
        secrets: &ClientSecrets,
        refresh_token: &str,
    ) -> Result<StoredToken, AuditError> {
        let mut form = vec![
            ("client_id", secrets.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = secrets.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = self
            .client
            .post(&secrets.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuditError::Auth(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AuditError::Auth(describe_token_error(status, &body)));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuditError::Auth(format!("unexpected token response: {}", e)))?;
        info!("Refreshed access token");
        Ok(parsed.into_stored(Some(refresh_token.to_string()), now_secs()))
    }

    async fn device_flow(&self, secrets: &ClientSecrets) -> Result<StoredToken, AuditError> {
        let response = self
            .client
            .post(oauth::DEVICE_CODE_URL)
            .form(&[("client_id", secrets.client_id.as_str()), ("scope", oauth::SCOPE)])
            .send()
            .await
            .map_err(|e| AuditError::Auth(format!("device code request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AuditError::Auth(describe_token_error(status, &body)));
        }
        let device: DeviceCodeResponse = serde_json::from_str(&body)
            .map_err(|e| AuditError::Auth(format!("unexpected device code response: {}", e)))?;

        eprintln!(
            "\nTo authorize access to your YouTube account, visit:\n\n    {}\n\nand enter the code: {}\n",
            device.verification_url, device.user_code
        );

        let deadline = now_secs() + device.expires_in as i64;
        let mut interval = device.interval;

        let mut form = vec![
            ("client_id", secrets.client_id.as_str()),
            ("device_code", device.device_code.as_str()),
            ("grant_type", oauth::DEVICE_GRANT_TYPE),
        ];
        if let Some(secret) = secrets.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        loop {
            if now_secs() >= deadline {
                return Err(AuditError::Auth(
                    "the authorization code expired before it was confirmed".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_secs(interval)).await;

            let response = self
                .client
                .post(&secrets.token_uri)
                .form(&form)
                .send()
                .await
                .map_err(|e| AuditError::Auth(format!("token polling failed: {}", e)))?;

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.is_success() {
                let parsed: TokenResponse = serde_json::from_str(&body)
                    .map_err(|e| AuditError::Auth(format!("unexpected token response: {}", e)))?;
                info!("Authorization complete");
                return Ok(parsed.into_stored(None, now_secs()));
            }

            match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) if err.error == "authorization_pending" => {}
                Ok(err) if err.error == "slow_down" => interval += 5,
                _ => return Err(AuditError::Auth(describe_token_error(status, &body))),
            }
        }
    }
}

fn describe_token_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(TokenErrorResponse {
            error,
            error_description: Some(description),
        }) => format!("{} ({}): {}", error, status, description),
        Ok(TokenErrorResponse { error, .. }) => format!("{} ({})", error, status),
        Err(_) => format!("token endpoint returned {}: {}", status, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_token_freshness() {
        let token = StoredToken {
            access_token: "ya29.x".to_string(),
            refresh_token: None,
            expires_at: 10_000,
        };
        assert!(token.is_fresh(5_000));
        // Inside the expiry skew counts as expired
        assert!(!token.is_fresh(10_000 - 30));
        assert!(!token.is_fresh(20_000));
    }

    #[test]
    fn test_token_roundtrip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        let token = StoredToken {
            access_token: "ya29.x".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at: 1_700_000_000,
        };
        token.save(&path);
        assert_eq!(StoredToken::load(&path), Some(token));
    }

    #[test]
    fn test_missing_or_bad_token_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        assert_eq!(StoredToken::load(&path), None);
        fs::write(&path, "garbage").unwrap();
        assert_eq!(StoredToken::load(&path), None);
    }

    #[test]
    fn test_token_response_keeps_previous_refresh_token() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "new", "expires_in": 3599, "token_type": "Bearer"}"#)
                .unwrap();
        let stored = response.into_stored(Some("old-refresh".to_string()), 100);
        assert_eq!(stored.access_token, "new");
        assert_eq!(stored.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(stored.expires_at, 3699);
    }

    #[test]
    fn test_client_secrets_installed_and_web() {
        let path = Path::new("credentials.json");
        let installed = ClientSecrets::from_json(
            r#"{"installed": {"client_id": "abc.apps.googleusercontent.com", "client_secret": "s3cret"}}"#,
            path,
        )
        .unwrap();
        assert_eq!(installed.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(installed.token_uri, oauth::TOKEN_URL);

        let web = ClientSecrets::from_json(
            r#"{"web": {"client_id": "web-id", "token_uri": "https://example.test/token"}}"#,
            path,
        )
        .unwrap();
        assert_eq!(web.client_id, "web-id");
        assert_eq!(web.client_secret, None);
        assert_eq!(web.token_uri, "https://example.test/token");

        assert!(matches!(
            ClientSecrets::from_json(r#"{"other": {}}"#, path),
            Err(AuditError::Auth(_))
        ));
    }

    #[test]
    fn test_missing_credentials_is_missing_input() {
        let dir = tempdir().unwrap();
        let err = ClientSecrets::load(&dir.path().join("credentials.json")).unwrap_err();
        assert!(matches!(err, AuditError::MissingInput { .. }));
        assert!(err.to_string().contains("Google Cloud Console"));
    }

    #[test]
    fn test_describe_token_error() {
        let body = r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#;
        assert_eq!(
            describe_token_error(reqwest::StatusCode::BAD_REQUEST, body),
            "invalid_grant (400 Bad Request): Token has been expired or revoked."
        );
    }
}
