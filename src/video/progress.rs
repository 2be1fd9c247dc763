//! Progress reporting while a job runs.

use std::sync::{Mutex, PoisonError};

/// Receives human-readable progress text.
///
/// The text is cosmetic. Nothing should infer job state from it.
pub trait ProgressSink: Send + Sync {
    /// Reports one progress message.
    fn report(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str) {}
}

/// Forwards progress to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, message: &str) {
        tracing::info!(progress = %message, "video generation progress");
    }
}

/// Records every message in order.
#[derive(Debug, Default)]
pub struct ProgressLog {
    messages: Mutex<Vec<String>>,
}

impl ProgressLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the messages reported so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of messages reported so far.
    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressSink for ProgressLog {
    fn report(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Texts shown around and during the wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    initializing: String,
    downloading: String,
    cycle: Vec<String>,
}

impl Default for Narration {
    fn default() -> Self {
        Self {
            initializing: "Initializing...".into(),
            downloading: "Downloading...".into(),
            cycle: [
                "Synthesizing high-fidelity visual nodes...",
                "Rendering photorealistic lighting textures...",
                "Calibrating natural human motion vectors...",
                "Finalizing 8K resolution pass...",
                "Securing video stream with quantum encryption...",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Narration {
    /// Creates a narration with a custom waiting cycle.
    ///
    /// Returns `None` if `cycle` is empty.
    pub fn new(
        initializing: impl Into<String>,
        downloading: impl Into<String>,
        cycle: impl IntoIterator<Item = impl Into<String>>,
    ) -> Option<Self> {
        let cycle: Vec<String> = cycle.into_iter().map(Into::into).collect();
        if cycle.is_empty() {
            return None;
        }
        Some(Self {
            initializing: initializing.into(),
            downloading: downloading.into(),
            cycle,
        })
    }

    /// Message shown before submission.
    pub fn initializing(&self) -> &str {
        &self.initializing
    }

    /// Message shown before the download starts.
    pub fn downloading(&self) -> &str {
        &self.downloading
    }

    /// Message for the `index`-th pending observation, wrapping around.
    pub fn pending(&self, index: usize) -> &str {
        &self.cycle[index % self.cycle.len()]
    }

    /// Number of messages in the waiting cycle.
    pub fn cycle_len(&self) -> usize {
        self.cycle.len()
    }
}
