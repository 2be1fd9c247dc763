//! Video generation module.

mod backend;
mod poller;
mod progress;
pub mod providers;
mod types;

pub use backend::{BackendResult, VideoBackend};
pub use poller::{JobPoller, JobPollerBuilder, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL};
pub use progress::{Narration, NoProgress, ProgressLog, ProgressSink, TracingProgress};
pub use types::{
    GeneratedVideo, GenerationRequest, JobHandle, JobOutput, JobStatus, StatusTag, VideoMetadata,
    DEFAULT_ASPECT_RATIO, DEFAULT_RESOLUTION,
};
