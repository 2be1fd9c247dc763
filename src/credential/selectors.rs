//! Key selectors for non-interactive and terminal hosts.

use crate::credential::gate::KeySelector;
use crate::credential::store::{ApiKey, CredentialStore};
use crate::error::{Result, StudioError};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Default environment variable holding the Gemini API key.
pub const DEFAULT_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Selects the key from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvKeySelector {
    store: CredentialStore,
    var: String,
}

impl EnvKeySelector {
    /// Reads `GOOGLE_API_KEY` into `store` on selection.
    pub fn new(store: CredentialStore) -> Self {
        Self::with_var(store, DEFAULT_KEY_VAR)
    }

    /// Reads a custom variable into `store` on selection.
    pub fn with_var(store: CredentialStore, var: impl Into<String>) -> Self {
        Self {
            store,
            var: var.into(),
        }
    }
}

#[async_trait]
impl KeySelector for EnvKeySelector {
    async fn has_selected_key(&self) -> Result<bool> {
        Ok(self.store.is_selected())
    }

    async fn open_select_key(&self) -> Result<()> {
        let key = std::env::var(&self.var)
            .ok()
            .and_then(ApiKey::new)
            .ok_or_else(|| {
                StudioError::CredentialUnavailable(format!("{} is not set", self.var))
            })?;
        self.store.set(key);
        tracing::debug!(var = %self.var, "selected API key from environment");
        Ok(())
    }
}

type SharedInput = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// Asks for the key on the terminal.
///
/// The prompt goes to stderr and one line is read from the input on a
/// blocking thread. End of input or a blank line means the user gave up.
#[derive(Clone)]
pub struct PromptKeySelector {
    store: CredentialStore,
    input: SharedInput,
    prompt: String,
}

impl PromptKeySelector {
    /// Prompts on stderr and reads from stdin.
    pub fn new(store: CredentialStore) -> Self {
        Self::with_input(store, io::BufReader::new(io::stdin()))
    }

    /// Reads the key from a custom source.
    pub fn with_input(store: CredentialStore, input: impl BufRead + Send + 'static) -> Self {
        Self {
            store,
            input: Arc::new(Mutex::new(Box::new(input))),
            prompt: "Enter Gemini API key (paid-tier project required for Veo): ".into(),
        }
    }

    /// Overrides the prompt text.
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

fn read_key(input: &SharedInput, prompt: &str) -> io::Result<Option<ApiKey>> {
    let mut stderr = io::stderr().lock();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;
    drop(stderr);

    let mut line = String::new();
    let read = input
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(ApiKey::new(line))
}

#[async_trait]
impl KeySelector for PromptKeySelector {
    async fn has_selected_key(&self) -> Result<bool> {
        Ok(self.store.is_selected())
    }

    async fn open_select_key(&self) -> Result<()> {
        let input = Arc::clone(&self.input);
        let prompt = self.prompt.clone();
        let key = tokio::task::spawn_blocking(move || read_key(&input, &prompt))
            .await
            .map_err(|e| StudioError::CredentialUnavailable(format!("key prompt aborted: {e}")))?
            .map_err(|e| StudioError::CredentialUnavailable(format!("cannot read key: {e}")))?
            .ok_or_else(|| StudioError::CredentialUnavailable("no API key entered".into()))?;
        self.store.set(key);
        Ok(())
    }
}

impl std::fmt::Debug for PromptKeySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptKeySelector")
            .field("store", &self.store)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}
