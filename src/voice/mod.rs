//! Speech capture and output
//!
//! The session loop only sees the [`SpeechInput`] and [`SpeechOutput`] traits.
//! Microphone + STT and TTS + speaker implementations live here, along with
//! text stand-ins used by the demo and interactive modes.

mod capture;
mod microphone;
mod playback;
mod segmenter;
mod speaker;
mod stt;
mod text;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use microphone::{Microphone, normalize_transcript};
pub use playback::AudioPlayback;
pub use segmenter::{SegmenterState, SpeechSegmenter, calculate_energy};
pub use speaker::Speaker;
pub use stt::{SpeechToText, SttProvider};
pub use text::{ConsoleOutput, ScriptedInput, StdinInput};
pub use tts::{TextToSpeech, TtsProvider};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Why a capture produced no transcript
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Silence, or speech that could not be recognized
    #[error("no speech detected")]
    NoSpeech,

    /// The recognition service could not be reached
    #[error("speech service unreachable: {0}")]
    Unreachable(String),

    /// Any other capture failure (device, encoding)
    #[error("capture failed: {0}")]
    Failed(String),

    /// The input source is exhausted and will never produce more
    #[error("input closed")]
    Closed,
}

/// Bounds for a single capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenLimits {
    /// How long to wait for speech to start
    pub timeout: Duration,
    /// Longest phrase captured
    pub phrase_limit: Duration,
}

impl ListenLimits {
    /// Limits for the short "stop" listener that runs while speaking
    pub const STOP_WORD: Self = Self {
        timeout: Duration::from_secs(3),
        phrase_limit: Duration::from_secs(3),
    };

    #[must_use]
    pub const fn new(timeout: Duration, phrase_limit: Duration) -> Self {
        Self {
            timeout,
            phrase_limit,
        }
    }
}

impl Default for ListenLimits {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(5))
    }
}

/// How a speech output call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEnd {
    /// Everything was spoken
    Finished,
    /// The cancellation token fired first
    Interrupted,
}

/// A source of transcripts
///
/// Futures are not `Send`: audio streams must stay on the task that opened them.
#[async_trait(?Send)]
pub trait SpeechInput {
    /// Capture one utterance and return its lowercase transcript
    async fn listen(&self, limits: ListenLimits) -> std::result::Result<String, CaptureError>;
}

/// A sink that speaks text
#[async_trait(?Send)]
pub trait SpeechOutput {
    /// Speak `text`, stopping early once `cancel` fires
    ///
    /// Cancellation is checked at suspension points only, so a stop that
    /// lands between checks lets the current chunk finish.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<SpeechEnd>;
}
