use serde::{Deserialize, Serialize};

use crate::storage::{Storage, StorageError};

pub const ACCESS_TOKEN_KEY: &str = "statuswatch.access_token";
pub const REFRESH_TOKEN_KEY: &str = "statuswatch.refresh_token";

/// Credentials issued by the backend. Validity is only ever learned from a
/// backend rejection; nothing here tracks expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: Option<String>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: access.into(),
            refresh,
        }
    }
}

pub trait TokenStore: Send + Sync {
    /// Write-through: the next read observes `pair`. A missing refresh token
    /// removes any previously stored one. On error the previous pair is
    /// left in place.
    fn store(&self, pair: &TokenPair) -> Result<(), StorageError>;
    fn get_access(&self) -> Option<String>;
    fn get_refresh(&self) -> Option<String>;
    /// Removes both entries. Idempotent.
    fn clear(&self) -> Result<(), StorageError>;

    fn has_session(&self) -> bool {
        self.get_access().is_some()
    }
}

/// Token store backed by an origin-scoped [`Storage`].
#[derive(Debug)]
pub struct StorageTokenStore<S: Storage> {
    storage: S,
}

impl<S: Storage> StorageTokenStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage> TokenStore for StorageTokenStore<S> {
    fn store(&self, pair: &TokenPair) -> Result<(), StorageError> {
        let refresh = pair.refresh.as_deref().filter(|r| !r.is_empty());
        self.storage.apply(&[
            (ACCESS_TOKEN_KEY, Some(pair.access.as_str())),
            (REFRESH_TOKEN_KEY, refresh),
        ])?;
        tracing::debug!(has_refresh = refresh.is_some(), "stored session tokens");
        Ok(())
    }

    fn get_access(&self) -> Option<String> {
        self.storage.get_item(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn get_refresh(&self) -> Option<String> {
        self.storage.get_item(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.storage.apply(&[(ACCESS_TOKEN_KEY, None), (REFRESH_TOKEN_KEY, None)])?;
        tracing::debug!("cleared session tokens");
        Ok(())
    }
}
