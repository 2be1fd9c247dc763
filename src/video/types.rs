//! Core types for video generation.

use crate::error::{BackendError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default output resolution.
pub const DEFAULT_RESOLUTION: &str = "1080p";

/// Default aspect ratio.
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// A request to generate a video.
///
/// Requests are built once and never mutated after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The prompt sent to the backend.
    pub prompt: String,
    /// Output resolution (e.g., "1080p", "720p").
    pub resolution: String,
    /// Aspect ratio (e.g., "16:9", "9:16").
    pub aspect_ratio: String,
    #[serde(skip, default = "one_video")]
    number_of_videos: u32,
}

fn one_video() -> u32 {
    1
}

impl GenerationRequest {
    /// Creates a request that sends `prompt` verbatim.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            resolution: DEFAULT_RESOLUTION.into(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.into(),
            number_of_videos: one_video(),
        }
    }

    /// Creates a request for the studio's advisor presentation of `topic`.
    ///
    /// ```
    /// use wealthgenius::GenerationRequest;
    ///
    /// let request = GenerationRequest::advisor("explain IUL tax benefits");
    /// assert!(request.prompt.contains("explaining: explain IUL tax benefits."));
    /// ```
    pub fn advisor(topic: impl AsRef<str>) -> Self {
        Self::new(format!(
            "Hyper-photorealistic 8k video of a professional financial advisor in a modern \
             high-tech office explaining: {}. Cinematic lighting, natural human movement, \
             clear authoritative financial tone.",
            topic.as_ref().trim()
        ))
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = ratio.into();
        self
    }

    /// Number of videos requested. Always 1.
    pub fn number_of_videos(&self) -> u32 {
        self.number_of_videos
    }
}

/// Opaque reference to an in-flight backend job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    /// Wraps a backend operation name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the backend operation name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutput {
    /// Download location of the first generated video.
    pub video_uri: Option<String>,
}

/// Latest known state of a backend job.
#[derive(Debug)]
pub enum JobStatus {
    /// Still running.
    Pending,
    /// Finished successfully.
    Done(JobOutput),
    /// Finished with an error.
    Failed(BackendError),
}

impl JobStatus {
    /// Returns the plain state tag.
    pub fn tag(&self) -> StatusTag {
        match self {
            Self::Pending => StatusTag::Pending,
            Self::Done(_) => StatusTag::Done,
            Self::Failed(_) => StatusTag::Failed,
        }
    }

    /// Returns true for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Job state without payload, for host display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    /// Still running.
    Pending,
    /// Finished with a result.
    Done,
    /// Finished with an error.
    Failed,
}

impl std::fmt::Display for StatusTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Metadata about the video generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Backend job that produced the video.
    pub job: Option<JobHandle>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Number of status polls made after submission.
    pub polls: u32,
    /// Video resolution.
    pub resolution: Option<String>,
}

/// A downloaded video.
///
/// The bytes live in memory until the value is dropped; `save` and
/// `to_data_url` give the host something it can address locally.
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    /// Raw video bytes.
    pub data: Vec<u8>,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
    /// Generation metadata.
    pub metadata: VideoMetadata,
}

impl GeneratedVideo {
    /// Creates a new generated video.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, metadata: VideoMetadata) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            metadata,
        }
    }

    /// Returns the size of the video data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the video to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the video data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the video as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}
