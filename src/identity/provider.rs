//! Session lookup against the identity provider.
//!
//! The identity service itself (sign-up, credentials, token issuance) lives
//! outside this crate. [`SessionProvider`] is the seam; [`StaticSessionProvider`]
//! serves sessions exported to a JSON file:
//!
//! ```json
//! [
//!   { "token": "s3cr3t", "id": "u1", "name": "Ada", "email": "ada@example.com" }
//! ]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::info;

/// Account data the provider returns for a valid session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read sessions file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid sessions file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Resolves a session token to the account that owns it.
///
/// `Ok(None)` means the token is unknown or expired; `Err` means the provider
/// could not answer at all.
pub trait SessionProvider: Send + Sync {
    fn lookup(&self, token: &str) -> Result<Option<Account>, IdentityError>;
}

#[derive(Deserialize)]
struct SessionEntry {
    token: String,
    #[serde(flatten)]
    account: Account,
}

/// Fixed set of sessions, compared in constant time.
#[derive(Default)]
pub struct StaticSessionProvider {
    sessions: Vec<(Vec<u8>, Account)>,
}

impl StaticSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session token for `account`.
    pub fn with_session(mut self, token: impl Into<String>, account: Account) -> Self {
        self.sessions.push((token.into().into_bytes(), account));
        self
    }

    /// Load sessions from a JSON array file.
    pub fn from_file(path: &Path) -> Result<Self, IdentityError> {
        let raw = std::fs::read_to_string(path).map_err(|source| IdentityError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<SessionEntry> =
            serde_json::from_str(&raw).map_err(|source| IdentityError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), sessions = entries.len(), "Loaded sessions");

        Ok(entries
            .into_iter()
            .fold(Self::new(), |provider, entry| {
                provider.with_session(entry.token, entry.account)
            }))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionProvider for StaticSessionProvider {
    fn lookup(&self, token: &str) -> Result<Option<Account>, IdentityError> {
        let presented = token.as_bytes();

        // Scan every entry so timing does not reveal which token matched.
        let mut found = None;
        for (stored, account) in &self.sessions {
            if bool::from(stored.as_slice().ct_eq(presented)) && found.is_none() {
                found = Some(account);
            }
        }
        Ok(found.cloned())
    }
}
