//! OAuth client configuration.
//!
//! The client identifier, secret, and endpoint URIs are loaded once from a
//! JSON file before any authorization attempt. The file may be either the
//! installed-application shape exported by the provider console
//! (`{"installed": {...}}`, `{"web": {...}}` also accepted) or the bare
//! object.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// The single scope requested for publishing: write access to Blogger.
pub const BLOGGER_SCOPE: &str = "https://www.googleapis.com/auth/blogger";

/// Default authorization endpoint.
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
/// Default token exchange and refresh endpoint.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Default local port for the callback listener.
const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// OAuth client configuration for the authorization-code flow.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth2 client identifier.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Authorization endpoint URL.
    pub auth_uri: String,
    /// Token exchange and refresh endpoint URL.
    pub token_uri: String,
    /// Local port the callback listener binds.
    pub callback_port: u16,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretBody>,
    web: Option<ClientSecretBody>,
    #[serde(flatten)]
    bare: Option<ClientSecretBody>,
}

#[derive(Deserialize)]
struct ClientSecretBody {
    client_id: String,
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl OAuthConfig {
    /// Creates a configuration with default endpoints and callback port.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
        }
    }

    /// Loads the configuration from a client-secret JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            Error::io(
                format!("failed to read client secret file {}", path.display()),
                err,
            )
        })?;
        let file: ClientSecretFile = serde_json::from_str(&content).map_err(|err| {
            Error::serialization(
                format!("failed to parse client secret file {}", path.display()),
                Some(Box::new(err)),
            )
        })?;

        let body = file.installed.or(file.web).or(file.bare).ok_or_else(|| {
            Error::serialization(
                format!(
                    "client secret file {} has neither an \"installed\" nor a \"web\" section",
                    path.display()
                ),
                None,
            )
        })?;

        let mut config = OAuthConfig::new(body.client_id, body.client_secret);
        if let Some(auth_uri) = body.auth_uri {
            config.auth_uri = auth_uri;
        }
        if let Some(token_uri) = body.token_uri {
            config.token_uri = token_uri;
        }
        Ok(config)
    }

    /// Overrides the callback listener port.
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }
}
