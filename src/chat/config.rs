//! Configuration types for the chat front-end.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the binary hands to the controller.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

/// Default OAuth client secret file, as downloaded from the Google console.
const DEFAULT_CLIENT_SECRET: &str = "client_secret.json";

/// Default credential record path.
const DEFAULT_TOKEN: &str = "token.json";

/// Default post template path.
const DEFAULT_TEMPLATE: &str = "post_template.html";

/// Default local OAuth callback port.
const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// Command-line arguments for the reelpost-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Blog to publish to.
    #[arrrg(optional, "Blogger blog id to publish to", "BLOG_ID")]
    pub blog_id: Option<String>,

    /// OAuth client secret file.
    #[arrrg(optional, "Path to client_secret.json (default: client_secret.json)", "PATH")]
    pub client_secret: Option<String>,

    /// Credential record path.
    #[arrrg(optional, "Path to the stored token (default: token.json)", "PATH")]
    pub token: Option<String>,

    /// Post template path.
    #[arrrg(optional, "Path to the post template (default: post_template.html)", "PATH")]
    pub template: Option<String>,

    /// Local OAuth callback port.
    #[arrrg(optional, "Local OAuth callback port (default: 8080)", "PORT")]
    pub port: Option<u16>,
}

/// Resolved configuration for the chat front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Blog to publish to.
    pub blog_id: Option<String>,

    /// OAuth client secret file.
    pub client_secret: PathBuf,

    /// Credential record path.
    pub token: PathBuf,

    /// Post template path.
    pub template: PathBuf,

    /// Local OAuth callback port.
    pub callback_port: u16,
}

impl ChatConfig {
    /// Creates a ChatConfig with default paths and no blog id.
    pub fn new() -> Self {
        Self {
            blog_id: None,
            client_secret: PathBuf::from(DEFAULT_CLIENT_SECRET),
            token: PathBuf::from(DEFAULT_TOKEN),
            template: PathBuf::from(DEFAULT_TEMPLATE),
            callback_port: DEFAULT_CALLBACK_PORT,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            blog_id: args.blog_id,
            client_secret: args
                .client_secret
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT_SECRET)),
            token: args
                .token
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN)),
            template: args
                .template
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE)),
            callback_port: args.port.unwrap_or(DEFAULT_CALLBACK_PORT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.blog_id, None);
        assert_eq!(config.client_secret, PathBuf::from("client_secret.json"));
        assert_eq!(config.token, PathBuf::from("token.json"));
        assert_eq!(config.template, PathBuf::from("post_template.html"));
        assert_eq!(config.callback_port, 8080);
    }

    #[test]
    fn args_override_defaults() {
        let args = ChatArgs {
            blog_id: Some("b-9".to_string()),
            client_secret: Some("/etc/reelpost/secret.json".to_string()),
            token: Some("/var/lib/reelpost/token.json".to_string()),
            template: Some("review.html".to_string()),
            port: Some(9090),
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.blog_id.as_deref(), Some("b-9"));
        assert_eq!(config.client_secret, PathBuf::from("/etc/reelpost/secret.json"));
        assert_eq!(config.token, PathBuf::from("/var/lib/reelpost/token.json"));
        assert_eq!(config.template, PathBuf::from("review.html"));
        assert_eq!(config.callback_port, 9090);
    }

    #[test]
    fn empty_args_resolve_to_defaults() {
        assert_eq!(ChatConfig::from(ChatArgs::default()), ChatConfig::new());
    }
}
