//! Error types for credential selection and video generation.

use std::time::Duration;

/// Maximum length of a backend message kept in an error.
const MAX_MESSAGE_LEN: usize = 500;

/// Failures reported by a [`VideoBackend`](crate::video::VideoBackend).
///
/// Backends classify every failure into one of these kinds at the edge, so
/// callers never have to inspect message text to decide what to do.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No API key has been selected yet.
    #[error("no API key selected")]
    MissingKey,

    /// The backend rejected the selected API key.
    #[error("credential rejected: {0}")]
    CredentialRejected(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The backend refused the request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The remote job reached a terminal failure.
    #[error("job failed: {0}")]
    JobFailed(String),

    /// The backend answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    /// Returns true if the backend refused the selected key.
    ///
    /// A missing key is not a rejection.
    pub fn is_credential_rejected(&self) -> bool {
        matches!(self, Self::CredentialRejected(_))
    }
}

/// Errors surfaced to the host by the credential gate and job poller.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// The interactive key selection flow could not be completed.
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// The backend refused the initial generation request.
    #[error("submission failed: {0}")]
    SubmissionFailed(#[source] BackendError),

    /// A poll or download failed after the job was accepted.
    #[error("generation failed: {0}")]
    GenerationFailed(#[source] BackendError),

    /// The job finished but reported no retrievable video.
    #[error("generation completed but no video was returned")]
    MissingResult,

    /// The wait budget ran out before the job finished.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the generation.
    #[error("generation cancelled")]
    Cancelled,

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// Returns true if the failure was caused by a rejected API key.
    pub fn credential_rejected(&self) -> bool {
        match self {
            Self::SubmissionFailed(e) | Self::GenerationFailed(e) => e.is_credential_rejected(),
            _ => false,
        }
    }

    /// Returns the backend cause, if any.
    pub fn backend_cause(&self) -> Option<&BackendError> {
        match self {
            Self::SubmissionFailed(e) | Self::GenerationFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for studio operations.
pub type Result<T> = std::result::Result<T, StudioError>;

/// Strips API keys out of a backend message and caps its length.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_MESSAGE_LEN));
    let mut rest = text;
    while let Some(pos) = rest.find("key=") {
        out.push_str(&rest[..pos + 4]);
        out.push_str("[REDACTED]");
        let tail = &rest[pos + 4..];
        let end = tail
            .find(|c: char| c == '&' || c == '"' || c.is_whitespace())
            .unwrap_or(tail.len());
        rest = &tail[end..];
    }
    out.push_str(rest);

    let out = out.trim().to_string();
    if out.chars().count() > MAX_MESSAGE_LEN {
        let truncated: String = out.chars().take(MAX_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        out
    }
}

/// Reads a `Retry-After` header expressed in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
