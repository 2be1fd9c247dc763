//! Submit, poll and download a generation job.

use crate::credential::{CredentialGate, CredentialStore};
use crate::error::{BackendError, Result, StudioError};
use crate::video::backend::VideoBackend;
use crate::video::progress::{Narration, ProgressSink};
use crate::video::types::{
    GeneratedVideo, GenerationRequest, JobHandle, JobOutput, JobStatus, VideoMetadata,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default ceiling on the time spent waiting for a job.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30 * 60);

/// Builder for [`JobPoller`].
pub struct JobPollerBuilder {
    backend: Arc<dyn VideoBackend>,
    gate: CredentialGate,
    credentials: CredentialStore,
    poll_interval: Duration,
    max_wait: Option<Duration>,
    narration: Narration,
}

impl JobPollerBuilder {
    /// Sets the delay between status polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for a job after submission.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Polls until the job finishes, however long that takes.
    pub fn unbounded(mut self) -> Self {
        self.max_wait = None;
        self
    }

    /// Replaces the progress texts.
    pub fn narration(mut self, narration: Narration) -> Self {
        self.narration = narration;
        self
    }

    /// Builds the poller.
    pub fn build(self) -> JobPoller {
        JobPoller {
            backend: self.backend,
            gate: self.gate,
            credentials: self.credentials,
            poll_interval: self.poll_interval,
            max_wait: self.max_wait,
            narration: self.narration,
        }
    }
}

/// Drives one generation from key check to downloaded video.
///
/// Each call to [`generate`](Self::generate) owns its own job handle and
/// narration position, so one poller can serve several independent
/// generations.
pub struct JobPoller {
    backend: Arc<dyn VideoBackend>,
    gate: CredentialGate,
    credentials: CredentialStore,
    poll_interval: Duration,
    max_wait: Option<Duration>,
    narration: Narration,
}

impl JobPoller {
    /// Creates a builder.
    ///
    /// `credentials` must be the store the gate's selector writes to.
    pub fn builder(
        backend: Arc<dyn VideoBackend>,
        gate: CredentialGate,
        credentials: CredentialStore,
    ) -> JobPollerBuilder {
        JobPollerBuilder {
            backend,
            gate,
            credentials,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
            narration: Narration::default(),
        }
    }

    /// Returns the credential gate.
    pub fn gate(&self) -> &CredentialGate {
        &self.gate
    }

    /// Generates a video, reporting progress to `progress`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
    ) -> Result<GeneratedVideo> {
        self.generate_with_cancel(request, progress, &CancellationToken::new())
            .await
    }

    /// Generates a video, stopping early when `cancel` fires.
    ///
    /// Cancelling only stops the local wait; the remote job keeps running.
    /// When the backend rejects the key, the gate's selection flow is
    /// reopened before the error is returned so that a retry by the caller
    /// can succeed. The generation itself is never retried here.
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<GeneratedVideo> {
        if request.prompt.trim().is_empty() {
            return Err(StudioError::InvalidRequest("prompt is empty".into()));
        }

        until_cancelled(cancel, self.gate.ensure_credential()).await??;

        progress.report(self.narration.initializing());
        let result = self.run(request, progress, cancel).await;

        if let Err(err) = &result {
            if err.credential_rejected() {
                if let Err(reselect) = self.gate.force_reselect().await {
                    tracing::warn!("key reselection failed: {reselect}");
                }
            }
        }
        result
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<GeneratedVideo> {
        let start = Instant::now();
        // A budget too large to represent is no budget at all.
        let deadline = self.max_wait.and_then(|max_wait| {
            Some(Deadline {
                at: start.checked_add(max_wait)?,
                max_wait,
            })
        });

        let (handle, status) = bounded(cancel, deadline, self.backend.submit_job(request))
            .await?
            .map_err(StudioError::SubmissionFailed)?;
        tracing::info!(
            operation = %handle,
            backend = self.backend.name(),
            "submitted video generation request"
        );

        let (output, polls) = self
            .wait_for_completion(&handle, status, progress, cancel, start, deadline)
            .await?;

        let uri = output.video_uri.ok_or(StudioError::MissingResult)?;
        tracing::debug!(operation = %handle, url = %uri, "video generation complete");

        progress.report(self.narration.downloading());
        let key = self
            .credentials
            .get()
            .ok_or(StudioError::GenerationFailed(BackendError::MissingKey))?;
        let data = bounded(cancel, deadline, self.backend.fetch_bytes(&uri, &key))
            .await?
            .map_err(StudioError::GenerationFailed)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            operation = %handle,
            bytes = data.len(),
            duration_ms,
            "downloaded generated video"
        );

        Ok(GeneratedVideo::new(
            data,
            self.backend.mime_type(),
            VideoMetadata {
                model: Some(self.backend.model().to_string()),
                job: Some(handle),
                duration_ms: Some(duration_ms),
                polls,
                resolution: Some(request.resolution.clone()),
            },
        ))
    }

    /// Polls until the job leaves `Pending`, returning its output and the
    /// number of polls made.
    async fn wait_for_completion(
        &self,
        handle: &JobHandle,
        mut status: JobStatus,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
        start: Instant,
        deadline: Option<Deadline>,
    ) -> Result<(JobOutput, u32)> {
        let mut pending = 0usize;
        let mut polls = 0u32;

        loop {
            match status {
                JobStatus::Pending => {}
                JobStatus::Done(output) => return Ok((output, polls)),
                JobStatus::Failed(err) => return Err(StudioError::GenerationFailed(err)),
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline.at {
                    tracing::warn!(operation = %handle, polls, "gave up waiting for video job");
                    return Err(StudioError::Timeout(deadline.max_wait));
                }
            }

            progress.report(self.narration.pending(pending));
            pending += 1;

            tracing::debug!(
                operation = %handle,
                polls,
                elapsed_secs = start.elapsed().as_secs(),
                "polling video generation"
            );
            // The sleep is cut short at the deadline.
            bounded(cancel, deadline, tokio::time::sleep(self.poll_interval)).await?;

            status = bounded(cancel, deadline, self.backend.poll_job(handle))
                .await?
                .map_err(StudioError::GenerationFailed)?;
            polls += 1;
        }
    }
}

impl std::fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller")
            .field("backend", &self.backend.name())
            .field("poll_interval", &self.poll_interval)
            .field("max_wait", &self.max_wait)
            .finish_non_exhaustive()
    }
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = T>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StudioError::Cancelled),
        out = future => Ok(out),
    }
}

/// End of the wait budget of one generation.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    max_wait: Duration,
}

/// Runs `future` until it completes, `cancel` fires or `deadline` passes.
async fn bounded<T>(
    cancel: &CancellationToken,
    deadline: Option<Deadline>,
    future: impl Future<Output = T>,
) -> Result<T> {
    let Some(deadline) = deadline else {
        return until_cancelled(cancel, future).await;
    };
    until_cancelled(cancel, tokio::time::timeout_at(deadline.at, future))
        .await?
        .map_err(|_| {
            tracing::warn!(
                max_wait_secs = deadline.max_wait.as_secs(),
                "video job exceeded its wait budget"
            );
            StudioError::Timeout(deadline.max_wait)
        })
}
