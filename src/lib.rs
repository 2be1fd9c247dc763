#![warn(missing_docs)]
//! WealthGenius - credential-gated video generation for the studio.
//!
//! This crate turns a financial-education topic into a generated video by
//! driving a long-running backend job: it makes sure an API key is selected,
//! submits the request, polls the job while narrating progress, and downloads
//! the finished asset.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wealthgenius::{
//!     CredentialGate, EnvKeySelector, GenerationRequest, JobPoller, TracingProgress, VeoBackend,
//! };
//!
//! #[tokio::main]
//! async fn main() -> wealthgenius::Result<()> {
//!     let backend = VeoBackend::builder().build()?;
//!     let store = backend.credentials().clone();
//!     let gate = CredentialGate::new(Arc::new(EnvKeySelector::new(store.clone())));
//!
//!     let poller = JobPoller::builder(Arc::new(backend), gate, store).build();
//!     let request = GenerationRequest::advisor("tax advantages of Roth IRAs");
//!     let video = poller.generate(&request, &TracingProgress).await?;
//!     video.save("roth.mp4")?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `veo`: Veo backend over the Gemini Developer API
//! - `cli`: `wealthgenius` command-line interface

pub mod credential;
mod error;
pub mod video;

// Re-export error types at crate root
pub use error::{BackendError, Result, StudioError};

pub use credential::{
    ApiKey, CredentialGate, CredentialStore, EnvKeySelector, KeySelector, PromptKeySelector,
};

pub use video::{
    GeneratedVideo, GenerationRequest, JobHandle, JobOutput, JobPoller, JobPollerBuilder,
    JobStatus, Narration, NoProgress, ProgressLog, ProgressSink, StatusTag, TracingProgress,
    VideoBackend, VideoMetadata,
};

#[cfg(feature = "veo")]
pub use video::providers::{VeoBackend, VeoBackendBuilder, VeoModel};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::credential::{CredentialGate, CredentialStore, KeySelector};
    pub use crate::error::{Result, StudioError};
    pub use crate::video::{
        GeneratedVideo, GenerationRequest, JobPoller, ProgressSink, VideoBackend,
    };

    #[cfg(feature = "veo")]
    pub use crate::video::providers::VeoBackend;
}
