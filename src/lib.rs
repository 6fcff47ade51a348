// Public modules
pub mod blogger;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fields;
pub mod listener;
pub mod observability;
pub mod template;

// Re-exports
pub use blogger::{AuthCompletion, AuthState, BlogInfo, BloggerClient};
pub use config::OAuthConfig;
pub use credentials::{CredentialRecord, CredentialStore, FileCredentialStore};
pub use error::{Error, Result};
pub use fields::{Field, FieldMap};
pub use template::TemplateEngine;
