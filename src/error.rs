//! Error types for the mirror assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or stream error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Completion service error
    #[error("completion error: {0}")]
    Completion(String),

    /// Status display error
    #[error("status error: {0}")]
    Status(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the session loop should stop on this error
    ///
    /// Only misconfiguration is fatal; everything else is retried after a backoff.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether this error signals an exhausted quota or a rate limit
    ///
    /// Matched on the rendered message: `quota` in any case, or the HTTP code `429`.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        is_quota_message(&self.to_string())
    }
}

/// Check an error message for quota or rate-limit markers
#[must_use]
pub fn is_quota_message(message: &str) -> bool {
    message.to_lowercase().contains("quota") || message.contains("429")
}
