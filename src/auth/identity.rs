use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::error::AuthError;
use crate::util::{build_http_client, validate_service_url, UrlValidationError};

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// A signed-in account as returned by the identity provider.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    /// Short-lived bearer token for follow-up calls (profile write).
    pub id_token: SecretString,
}

/// Profile document stored at sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Email/password account operations.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<AuthUser, AuthError>;

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<AuthUser, AuthError>;

    /// Write the profile document of `user`.
    async fn store_profile(&self, user: &AuthUser, profile: &UserProfile)
        -> Result<(), AuthError>;
}

// ============================================================================
// Firebase
// ============================================================================

/// Connection settings for [`FirebaseIdentity`].
#[derive(Clone)]
pub struct FirebaseSettings {
    pub api_key: Option<SecretString>,
    /// Needed for profile writes only.
    pub project_id: Option<String>,
    pub identity_base_url: String,
    pub firestore_base_url: String,
    pub timeout: Duration,
}

impl Default for FirebaseSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            project_id: None,
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            firestore_base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl std::fmt::Debug for FirebaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("project_id", &self.project_id)
            .field("identity_base_url", &self.identity_base_url)
            .field("firestore_base_url", &self.firestore_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Firebase Authentication (Identity Toolkit REST API) with profiles stored in
/// Firestore.
pub struct FirebaseIdentity {
    http: reqwest::Client,
    api_key: SecretString,
    project_id: Option<String>,
    identity_base: Url,
    firestore_base: Url,
    timeout: Duration,
}

impl std::fmt::Debug for FirebaseIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseIdentity")
            .field("project_id", &self.project_id)
            .field("identity_base", &self.identity_base.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn check_base(base: &str) -> Result<Url, AuthError> {
    validate_service_url(base).map_err(|e| match e {
        UrlValidationError::InvalidUrl(e) => AuthError::Service(format!("invalid endpoint: {e}")),
        UrlValidationError::Insecure | UrlValidationError::UnsupportedScheme(_) => {
            AuthError::InsecureBaseUrl
        }
    })
}

impl FirebaseIdentity {
    pub fn new(settings: FirebaseSettings) -> Result<Self, AuthError> {
        let api_key = settings.api_key.ok_or(AuthError::NotConfigured)?;
        let identity_base = check_base(&settings.identity_base_url)?;
        let firestore_base = check_base(&settings.firestore_base_url)?;
        let http = build_http_client()?;

        Ok(Self {
            http,
            api_key,
            project_id: settings.project_id.filter(|p| !p.trim().is_empty()),
            identity_base,
            firestore_base,
            timeout: settings.timeout,
        })
    }

    /// `{base}/accounts:{method}?key=...`
    ///
    /// Built by string concatenation: `Url::join` would read the `accounts:`
    /// prefix as a URL scheme.
    fn account_url(&self, method: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}accounts:{method}", self.identity_base))
            .map_err(|e| AuthError::Service(format!("invalid endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    fn profile_url(&self, project_id: &str, uid: &str) -> Result<Url, AuthError> {
        let mut url = self.firestore_base.clone();
        url.path_segments_mut()
            .map_err(|_| AuthError::Service("invalid Firestore endpoint".to_string()))?
            .pop_if_empty()
            .extend(["projects", project_id, "databases", "(default)", "documents", "users", uid]);
        Ok(url)
    }

    async fn account_request(
        &self,
        method: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthUser, AuthError> {
        let url = self.account_url(method)?;
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
            "returnSecureToken": true,
        });
        let body = serde_json::to_vec(&body).map_err(|e| AuthError::Service(e.to_string()))?;

        let response = tokio::time::timeout(
            self.timeout,
            self.http
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send(),
        )
        .await
        .map_err(|_| AuthError::Timeout)??;

        let status = response.status();
        let bytes = read_limited(response).await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            let err = AuthError::from_firebase_code(&message);
            tracing::debug!(method, status = status.as_u16(), error = %err, "Identity request rejected");
            return Err(err);
        }

        let account: AccountResponse = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::Service(format!("unexpected response: {e}")))?;

        Ok(AuthUser {
            uid: account.local_id,
            email: account.email.unwrap_or_else(|| email.to_string()),
            id_token: SecretString::from(account.id_token),
        })
    }
}

async fn read_limited(response: reqwest::Response) -> Result<Vec<u8>, AuthError> {
    if let Some(len) = response.content_length() {
        if len as usize > MAX_RESPONSE_SIZE {
            return Err(AuthError::Service("response too large".to_string()));
        }
    }
    let bytes = response.bytes().await?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        return Err(AuthError::Service("response too large".to_string()));
    }
    Ok(bytes.to_vec())
}

#[async_trait]
impl IdentityService for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<AuthUser, AuthError> {
        self.account_request("signInWithPassword", email, password)
            .await
    }

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<AuthUser, AuthError> {
        self.account_request("signUp", email, password).await
    }

    async fn store_profile(
        &self,
        user: &AuthUser,
        profile: &UserProfile,
    ) -> Result<(), AuthError> {
        let project_id = self
            .project_id
            .as_deref()
            .ok_or_else(|| AuthError::Service("no Firebase project id configured".to_string()))?;
        let url = self.profile_url(project_id, &user.uid)?;

        let document = serde_json::json!({
            "fields": {
                "name": { "stringValue": profile.name },
                "email": { "stringValue": profile.email },
                "createdAt": {
                    "timestampValue": profile.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
                },
            }
        });
        let body = serde_json::to_vec(&document).map_err(|e| AuthError::Service(e.to_string()))?;

        let response = tokio::time::timeout(
            self.timeout,
            self.http
                .patch(url)
                .bearer_auth(user.id_token.expose_secret())
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send(),
        )
        .await
        .map_err(|_| AuthError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Service(format!(
                "profile write failed with status {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}
