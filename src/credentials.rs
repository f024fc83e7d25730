//! # Credential Store
//!
//! Static mapping from requester identity to provider credentials, loaded once
//! at startup and read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identity of the user issuing a command (the chat transport's user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(pub i64);

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scope that partitions rows of one entity kind. The provider username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantKey(String);

impl TenantKey {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&TenantKey> for sea_orm::Value {
    fn from(tenant: &TenantKey) -> Self {
        sea_orm::Value::from(tenant.0.clone())
    }
}

/// Provider password, wiped from memory on drop and never printed.
#[derive(Clone, PartialEq, Eq, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub username: String,
    #[serde(alias = "secret")]
    pub password: Secret,
}

impl Credential {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password),
        }
    }

    pub fn tenant(&self) -> TenantKey {
        TenantKey::new(self.username.clone())
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse credentials file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid requester id '{value}' in credentials file")]
    InvalidRequester { value: String },
}

/// Requester → credential lookup.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: HashMap<RequesterId, Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (RequesterId, Credential)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Load a JSON object keyed by requester id:
    /// `{"123": {"username": "...", "password": "..."}}`.
    pub fn from_path(path: &Path) -> Result<Self, CredentialError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|err| match err {
            CredentialError::Parse { source, .. } => CredentialError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, CredentialError> {
        let parsed: HashMap<String, Credential> =
            serde_json::from_str(raw).map_err(|source| CredentialError::Parse {
                path: PathBuf::new(),
                source,
            })?;

        let mut entries = HashMap::with_capacity(parsed.len());
        for (key, credential) in parsed {
            let id = key
                .trim()
                .parse::<i64>()
                .map_err(|_| CredentialError::InvalidRequester { value: key.clone() })?;
            entries.insert(RequesterId(id), credential);
        }

        Ok(Self { entries })
    }

    pub fn insert(&mut self, requester: RequesterId, credential: Credential) {
        self.entries.insert(requester, credential);
    }

    pub fn get(&self, requester: RequesterId) -> Option<&Credential> {
        self.entries.get(&requester)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
