//! Shared API key storage.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A vendor-issued API key.
///
/// The value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a raw key, returning `None` for blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Returns the raw key for use on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Holds the currently selected API key.
///
/// Clones share the same slot. Key selectors write to it; backends and the
/// poller only read, and read it again on every request so a key chosen
/// mid-session takes effect on the next call.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<ApiKey>>>,
}

impl CredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with a key already selected.
    pub fn with_key(key: ApiKey) -> Self {
        let store = Self::new();
        store.set(key);
        store
    }

    /// Returns the selected key, if any.
    pub fn get(&self) -> Option<ApiKey> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if a key is selected.
    pub fn is_selected(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replaces the selected key.
    pub fn set(&self, key: ApiKey) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(key);
    }

    /// Forgets the selected key.
    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
