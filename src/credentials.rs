//! Credential persistence for the Blogger OAuth2 flow.
//!
//! One credential record is shared by every conversation (single-tenant
//! design) and persisted as a single JSON file. The store is deliberately
//! unsynchronized: callers must uphold a single-writer discipline, and
//! concurrent writes are last-writer-wins.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{Error, Result};

/// Leeway subtracted from the expiry when judging validity, so a token is
/// not presented moments before the server would reject it.
const EXPIRY_LEEWAY: Duration = Duration::seconds(60);

/// A persisted OAuth2 credential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Bearer token presented to the API.
    pub access_token: String,
    /// Token used to obtain a fresh access token after expiry, if the
    /// provider issued one.
    pub refresh_token: Option<String>,
    /// Instant at which the access token expires.
    #[serde(with = "rfc3339")]
    pub expiry: OffsetDateTime,
    /// Scope the token was granted.
    pub scope: String,
}

impl CredentialRecord {
    /// Returns true while the access token is usable (with leeway).
    pub fn is_valid(&self) -> bool {
        self.expiry - EXPIRY_LEEWAY > OffsetDateTime::now_utc()
    }

    /// Returns true once the access token has expired but a refresh token
    /// remains available.
    pub fn is_refreshable(&self) -> bool {
        !self.is_valid() && self.refresh_token.is_some()
    }
}

/// Storage for the single shared credential record.
///
/// Implementations are expected to be single-writer: the publishing client
/// is the only component that writes, and two concurrent authorization
/// attempts race with last-writer-wins semantics. Absence of a stored
/// record means "never authenticated".
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the stored record, or `None` if none has been persisted.
    async fn load(&self) -> Result<Option<CredentialRecord>>;

    /// Persists the record, replacing any previous one.
    async fn store(&self, record: &CredentialRecord) -> Result<()>;
}

/// Credential store backed by a single JSON file.
///
/// ```
/// # use reelpost::credentials::{CredentialStore, FileCredentialStore};
/// # tokio_test::block_on(async {
/// let dir = tempfile::tempdir().unwrap();
/// let store = FileCredentialStore::new(dir.path().join("token.json"));
/// // Nothing persisted yet means "never authenticated".
/// assert!(store.load().await.unwrap().is_none());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store reading and writing the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<CredentialRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(Error::io(
                    format!("failed to read credential file {}", self.path.display()),
                    err,
                ));
            }
        };
        let record = serde_json::from_slice(&bytes).map_err(|err| {
            Error::serialization(
                format!("failed to parse credential file {}", self.path.display()),
                Some(Box::new(err)),
            )
        })?;
        Ok(Some(record))
    }

    async fn store(&self, record: &CredentialRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record).map_err(|err| {
            Error::serialization("failed to serialize credential record", Some(Box::new(err)))
        })?;
        tokio::fs::write(&self.path, json).await.map_err(|err| {
            Error::io(
                format!("failed to write credential file {}", self.path.display()),
                err,
            )
        })
    }
}

/// RFC 3339 serde for `OffsetDateTime` expiry fields.
mod rfc3339 {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = datetime
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
    }
}
