//! Backend boundary for long-running video jobs.

use crate::credential::ApiKey;
use crate::error::BackendError;
use crate::video::types::{GenerationRequest, JobHandle, JobStatus};
use async_trait::async_trait;

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A service that runs video generation as a pollable job.
///
/// Implementations classify failures into [`BackendError`] kinds; in
/// particular a refused key must come back as
/// [`BackendError::CredentialRejected`].
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Starts a job, returning its handle and first status.
    async fn submit_job(&self, request: &GenerationRequest)
        -> BackendResult<(JobHandle, JobStatus)>;

    /// Fetches the latest status of a job.
    async fn poll_job(&self, handle: &JobHandle) -> BackendResult<JobStatus>;

    /// Downloads a finished asset.
    async fn fetch_bytes(&self, uri: &str, key: &ApiKey) -> BackendResult<Vec<u8>>;

    /// Model identifier used for generation.
    fn model(&self) -> &str;

    /// Returns the name of this backend for display.
    fn name(&self) -> &str {
        "video backend"
    }

    /// MIME type of downloaded assets.
    fn mime_type(&self) -> &str {
        "video/mp4"
    }
}
