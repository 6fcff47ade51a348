//! Client for publishing posts to the Blogger v3 API.
//!
//! The client owns the authentication state machine: it loads the persisted
//! credential record, refreshes it when expired, or runs a fresh
//! authorization-code flow through the local callback listener. Publishing
//! is a single-attempt remote call; there are no retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::config::{BLOGGER_SCOPE, OAuthConfig};
use crate::credentials::{CredentialRecord, CredentialStore};
use crate::error::{Error, Result};
use crate::listener::{CallbackListener, CallbackOutcome};
use crate::observability;

const BLOGGER_API_URL: &str = "https://www.googleapis.com/blogger/v3/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `complete_authorization` waits for the browser redirect. Kept
/// short so the interactive command path never stalls for long.
const DEFAULT_CALLBACK_WAIT: Duration = Duration::from_secs(30);

/// Authentication state reported by [`BloggerClient::ensure_authenticated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Credentials are loaded and valid; calls may proceed.
    Ready,
    /// The user must visit the authorization URL, then complete the flow.
    AuthorizationRequired(String),
}

/// Outcome of [`BloggerClient::complete_authorization`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCompletion {
    /// A code arrived and was exchanged; the client is ready.
    Success,
    /// No callback arrived within the wait bound.
    NoCodeReceived,
}

/// The one in-flight authorization attempt.
struct PendingAuthorization {
    auth_url: String,
    listener: CallbackListener,
}

/// Blog metadata returned by the diagnostics call.
#[derive(Debug, Clone, Deserialize)]
pub struct BlogInfo {
    /// Blog display name.
    pub name: String,
    /// Public URL of the blog.
    pub url: String,
    /// Blog description, if set.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize)]
struct NewPost<'a> {
    title: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct PostCreated {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
}

/// Client for the Blogger API with OAuth2 authorization-code credentials.
pub struct BloggerClient<S: CredentialStore> {
    http: reqwest::Client,
    config: OAuthConfig,
    store: S,
    blog_id: String,
    base_url: String,
    callback_wait: Duration,
    credentials: Option<CredentialRecord>,
    pending: Option<PendingAuthorization>,
}

impl<S: CredentialStore> BloggerClient<S> {
    /// Creates a new client for one blog.
    pub fn new(config: OAuthConfig, store: S, blog_id: impl Into<String>) -> Result<Self> {
        Self::with_options(config, store, blog_id, None, None)
    }

    /// Creates a new client with custom settings.
    pub fn with_options(
        config: OAuthConfig,
        store: S,
        blog_id: impl Into<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            http,
            config,
            store,
            blog_id: blog_id.into(),
            base_url: base_url.unwrap_or_else(|| BLOGGER_API_URL.to_string()),
            callback_wait: DEFAULT_CALLBACK_WAIT,
            credentials: None,
            pending: None,
        })
    }

    /// Overrides how long `complete_authorization` waits for the callback.
    pub fn set_callback_wait(&mut self, wait: Duration) {
        self.callback_wait = wait;
    }

    /// Returns the id of the blog this client publishes to.
    pub fn blog_id(&self) -> &str {
        &self.blog_id
    }

    /// Ensures the client holds usable credentials.
    ///
    /// Tries, in order: the in-memory record, the persisted record, a
    /// remote refresh of an expired record (persisting the result), and
    /// finally a fresh authorization-code flow. The fresh flow binds the
    /// callback listener, holds it as the pending authorization, and
    /// surfaces the authorization URL for the user. While an authorization
    /// is already pending its URL is re-surfaced rather than starting a
    /// second flow (the listener holds the port).
    pub async fn ensure_authenticated(&mut self) -> Result<AuthState> {
        if let Some(record) = &self.credentials
            && record.is_valid()
        {
            return Ok(AuthState::Ready);
        }

        if let Some(pending) = &self.pending {
            return Ok(AuthState::AuthorizationRequired(pending.auth_url.clone()));
        }

        if let Some(record) = self.store.load().await? {
            if record.is_valid() {
                self.credentials = Some(record);
                return Ok(AuthState::Ready);
            }
            if record.is_refreshable()
                && let Some(refresh_token) = record.refresh_token.clone()
                && let Ok(fresh) = self.refresh_credentials(&refresh_token, record.scope).await
            {
                self.store.store(&fresh).await?;
                self.credentials = Some(fresh);
                return Ok(AuthState::Ready);
            }
            // Refresh failed or was impossible; fall through to a new flow.
        }

        let listener = CallbackListener::bind(self.config.callback_port).await?;
        let auth_url = self.authorization_url(&listener.redirect_uri())?;
        observability::AUTH_FLOWS_STARTED.click();
        self.pending = Some(PendingAuthorization {
            auth_url: auth_url.clone(),
            listener,
        });
        Ok(AuthState::AuthorizationRequired(auth_url))
    }

    /// Completes a pending authorization-code flow.
    ///
    /// Blocks up to the configured wait for the callback listener. On code
    /// receipt the code is exchanged for tokens, the credential record is
    /// persisted, and the client becomes ready. The listener is stopped on
    /// every exit path.
    pub async fn complete_authorization(&mut self) -> Result<AuthCompletion> {
        let Some(mut pending) = self.pending.take() else {
            return Err(Error::validation(
                "No authorization in progress. Use /auth to start one first.",
                None,
            ));
        };

        let outcome = pending.listener.wait(self.callback_wait).await;
        let redirect_uri = pending.listener.redirect_uri();
        pending.listener.stop().await;

        match outcome {
            CallbackOutcome::Code(code) => {
                let record = self.exchange_code(&code, &redirect_uri).await?;
                self.store.store(&record).await?;
                self.credentials = Some(record);
                Ok(AuthCompletion::Success)
            }
            CallbackOutcome::Denied(error) => Err(Error::auth_exchange(format!(
                "authorization was denied: {error}"
            ))),
            CallbackOutcome::TimedOut => Ok(AuthCompletion::NoCodeReceived),
        }
    }

    /// Publishes one post.
    ///
    /// Auto-triggers `ensure_authenticated`; an authorization-required
    /// outcome is surfaced as an [`Error::AuthRequired`] rather than
    /// blocking. Labels are parsed as a comma-separated, trimmed,
    /// empty-filtered list. One remote attempt; transport failures carry
    /// the verbatim status and body.
    pub async fn publish(
        &mut self,
        title: &str,
        content: &str,
        labels: Option<&str>,
    ) -> Result<String> {
        match self.ensure_authenticated().await? {
            AuthState::Ready => {}
            AuthState::AuthorizationRequired(url) => return Err(Error::auth_required(url)),
        }
        let Some(credentials) = &self.credentials else {
            return Err(Error::unknown("client reported ready without credentials"));
        };

        let post = NewPost {
            title,
            content,
            labels: labels.map(parse_labels).filter(|l| !l.is_empty()),
        };

        observability::PUBLISH_REQUESTS.click();
        let url = format!("{}blogs/{}/posts/", self.base_url, self.blog_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&credentials.access_token)
            .json(&post)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            observability::PUBLISH_ERRORS.click();
            return Err(error_from_response(response).await);
        }

        let created: PostCreated = response.json().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse create-post response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(created.url.unwrap_or_else(|| "Unknown URL".to_string()))
    }

    /// Fetches blog metadata. Diagnostics only.
    pub async fn blog_info(&mut self) -> Result<BlogInfo> {
        match self.ensure_authenticated().await? {
            AuthState::Ready => {}
            AuthState::AuthorizationRequired(url) => return Err(Error::auth_required(url)),
        }
        let Some(credentials) = &self.credentials else {
            return Err(Error::unknown("client reported ready without credentials"));
        };

        let url = format!("{}blogs/{}", self.base_url, self.blog_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&credentials.access_token)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response.json::<BlogInfo>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse blog response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Builds the authorization URL for a fresh code flow.
    fn authorization_url(&self, redirect_uri: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.config.auth_uri,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", BLOGGER_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchanges an authorization code for a credential record.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<CredentialRecord> {
        observability::TOKEN_EXCHANGES.click();
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        let token = self.request_token(&params).await?;
        Ok(credential_from_token(token, None))
    }

    /// Obtains a fresh access token from a refresh token.
    async fn refresh_credentials(
        &self,
        refresh_token: &str,
        scope: String,
    ) -> Result<CredentialRecord> {
        observability::TOKEN_REFRESHES.click();
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let token = self.request_token(&params).await?;
        let mut record = credential_from_token(token, Some(scope));
        // The refresh response usually omits the refresh token; keep it.
        if record.refresh_token.is_none() {
            record.refresh_token = Some(refresh_token.to_string());
        }
        Ok(record)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.config.token_uri)
            .form(params)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth_exchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        response.json::<TokenResponse>().await.map_err(|e| {
            Error::auth_exchange(format!("failed to parse token response: {e}"))
        })
    }
}

fn credential_from_token(token: TokenResponse, fallback_scope: Option<String>) -> CredentialRecord {
    CredentialRecord {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expiry: OffsetDateTime::now_utc() + time::Duration::seconds(token.expires_in),
        scope: token
            .scope
            .or(fallback_scope)
            .unwrap_or_else(|| BLOGGER_SCOPE.to_string()),
    }
}

/// Splits a comma-separated label string into trimmed, non-empty labels.
fn parse_labels(labels: &str) -> Vec<String> {
    labels
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

fn map_request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Request timed out: {}", e), None)
    } else if e.is_connect() {
        Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
    } else {
        Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
    }
}

/// Converts a non-success response into an error carrying the verbatim
/// status and body.
async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("(failed to read error response: {e})"),
    };
    Error::api(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::FileCredentialStore;

    fn test_client(port: u16, dir: &std::path::Path) -> BloggerClient<FileCredentialStore> {
        let config = OAuthConfig::new("id-1", "sec-1").with_callback_port(port);
        let store = FileCredentialStore::new(dir.join("token.json"));
        BloggerClient::new(config, store, "b-123").unwrap()
    }

    #[test]
    fn parse_labels_trims_and_filters() {
        assert_eq!(parse_labels("a, b ,  , c"), vec!["a", "b", "c"]);
        assert_eq!(parse_labels(""), Vec::<String>::new());
        assert_eq!(parse_labels("one"), vec!["one"]);
    }

    #[test]
    fn client_creation_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(18270, dir.path());
        assert_eq!(client.base_url, BLOGGER_API_URL);
        assert_eq!(client.blog_id(), "b-123");
        assert_eq!(client.callback_wait, DEFAULT_CALLBACK_WAIT);
    }

    #[test]
    fn authorization_url_carries_flow_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client(18271, dir.path());
        let url = client
            .authorization_url("http://localhost:18271")
            .unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=id-1"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("blogger"));
    }

    #[tokio::test]
    async fn ensure_authenticated_uses_valid_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        let record = CredentialRecord {
            access_token: "stored".to_string(),
            refresh_token: None,
            expiry: OffsetDateTime::now_utc() + time::Duration::hours(1),
            scope: BLOGGER_SCOPE.to_string(),
        };
        store.store(&record).await.unwrap();

        let mut client = test_client(18272, dir.path());
        assert_eq!(
            client.ensure_authenticated().await.unwrap(),
            AuthState::Ready
        );
    }

    #[tokio::test]
    async fn ensure_authenticated_starts_flow_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(18273, dir.path());

        let state = client.ensure_authenticated().await.unwrap();
        let AuthState::AuthorizationRequired(url) = state else {
            panic!("expected authorization to be required");
        };
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A18273"));

        // A second call re-surfaces the same pending URL.
        let state = client.ensure_authenticated().await.unwrap();
        assert_eq!(state, AuthState::AuthorizationRequired(url));
    }

    #[tokio::test]
    async fn complete_authorization_without_pending_flow() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(18274, dir.path());
        let err = client.complete_authorization().await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn complete_authorization_times_out_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = test_client(18275, dir.path());
        client.set_callback_wait(Duration::from_millis(100));

        let state = client.ensure_authenticated().await.unwrap();
        assert!(matches!(state, AuthState::AuthorizationRequired(_)));

        let completion = client.complete_authorization().await.unwrap();
        assert_eq!(completion, AuthCompletion::NoCodeReceived);

        // The listener released the port; a fresh flow can bind it again.
        let state = client.ensure_authenticated().await.unwrap();
        assert!(matches!(state, AuthState::AuthorizationRequired(_)));
    }
}
