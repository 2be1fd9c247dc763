//! Video backend implementations.

#[cfg(feature = "veo")]
mod veo;

#[cfg(feature = "veo")]
pub use veo::{VeoBackend, VeoBackendBuilder, VeoModel, DEFAULT_BASE_URL};
