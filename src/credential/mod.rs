//! API key selection and the credential gate.

mod gate;
mod selectors;
mod store;

pub use gate::{CredentialGate, KeySelector};
pub use selectors::{EnvKeySelector, PromptKeySelector, DEFAULT_KEY_VAR};
pub use store::{ApiKey, CredentialStore};
