//! Error types for the reelpost crate.
//!
//! This module defines the error type shared by the OAuth flow, the
//! publishing client, and the conversation controller. Template failures
//! are rendered inline as markup and never surface here.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for reelpost operations.
#[derive(Clone, Debug)]
pub enum Error {
    /// User input failed a field validation rule. Never fatal; the
    /// controller re-prompts with the message and the session survives.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Field key that failed validation.
        field: Option<String>,
    },

    /// The client holds no usable credentials; the user must visit the
    /// authorization URL and then complete the flow.
    AuthRequired {
        /// The authorization URL to surface to the user.
        url: String,
    },

    /// The authorization-code exchange or a token refresh failed.
    AuthExchange {
        /// Human-readable error message.
        message: String,
    },

    /// The remote API rejected a call. The body is carried verbatim so it
    /// can be reported to the user unmodified.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body or error message.
        message: String,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// An operation exceeded its deadline.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// Unknown error.
    Unknown {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field,
        }
    }

    /// Creates a new authorization-required error.
    pub fn auth_required(url: impl Into<String>) -> Self {
        Error::AuthRequired { url: url.into() }
    }

    /// Creates a new authorization-exchange error.
    pub fn auth_exchange(message: impl Into<String>) -> Self {
        Error::AuthExchange {
            message: message.into(),
        }
    }

    /// Creates a new API error.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Error::Unknown {
            message: message.into(),
        }
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if this error indicates authorization is required.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Error::AuthRequired { .. })
    }

    /// Returns true if this error came from the token endpoints.
    pub fn is_auth_exchange(&self) -> bool {
        matches!(self, Error::AuthExchange { .. })
    }

    /// Returns true if this error is a remote API error.
    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation { message, field } => {
                if let Some(field) = field {
                    write!(f, "Validation error: {message} (field: {field})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::AuthRequired { url } => {
                write!(f, "Authorization required: visit {url}")
            }
            Error::AuthExchange { message } => {
                write!(f, "Authorization exchange failed: {message}")
            }
            Error::Api {
                status_code,
                message,
            } => {
                write!(f, "API error (status {status_code}): {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Unknown { message } => {
                write!(f, "Unknown error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for reelpost operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_required_display_carries_url() {
        let err = Error::auth_required("https://accounts.example.com/o/authorize?x=1");
        assert!(err.is_auth_required());
        assert!(err.to_string().contains("https://accounts.example.com"));
    }

    #[test]
    fn api_error_status_code() {
        let err = Error::api(403, "insufficient scope");
        assert_eq!(err.status_code(), Some(403));
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("insufficient scope"));
    }

    #[test]
    fn validation_display_includes_field() {
        let err = Error::validation("must be a number", Some("rating".to_string()));
        assert!(err.is_validation());
        assert!(err.to_string().contains("rating"));
    }
}
