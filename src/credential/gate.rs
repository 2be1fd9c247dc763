//! Credential gate: make sure a key is selected before expensive work.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Host-side key selection capability.
///
/// `open_select_key` may block on user interaction for as long as it takes.
/// Implementations report an unreachable selection flow as
/// [`StudioError::CredentialUnavailable`](crate::StudioError::CredentialUnavailable).
#[async_trait]
pub trait KeySelector: Send + Sync {
    /// Returns true if a key has already been selected.
    async fn has_selected_key(&self) -> Result<bool>;

    /// Runs the selection flow once.
    async fn open_select_key(&self) -> Result<()>;
}

/// Guards generation behind key selection.
///
/// The gate never reads or caches the key itself; it only guarantees that a
/// selection has happened.
#[derive(Clone)]
pub struct CredentialGate {
    selector: Arc<dyn KeySelector>,
}

impl CredentialGate {
    /// Creates a gate over the given selector.
    pub fn new(selector: Arc<dyn KeySelector>) -> Self {
        Self { selector }
    }

    /// Runs the selection flow if no key has been chosen yet.
    ///
    /// Selection runs at most once per call and the result is not re-checked.
    pub async fn ensure_credential(&self) -> Result<()> {
        if self.selector.has_selected_key().await? {
            tracing::debug!("API key already selected");
            return Ok(());
        }
        tracing::info!("no API key selected, opening key selection");
        self.selector.open_select_key().await
    }

    /// Runs the selection flow again after the backend rejected the key.
    pub async fn force_reselect(&self) -> Result<()> {
        tracing::info!("API key rejected, reopening key selection");
        self.selector.open_select_key().await
    }
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate").finish_non_exhaustive()
    }
}
