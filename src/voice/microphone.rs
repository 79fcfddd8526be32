//! Microphone input transcribed through an STT service

use std::time::Duration;

use async_trait::async_trait;

use super::{
    AudioCapture, CaptureError, ListenLimits, SAMPLE_RATE, SegmenterState, SpeechInput,
    SpeechSegmenter, SpeechToText, samples_to_wav,
};

/// How often captured audio is fed to the segmenter
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Listens on the default input device and transcribes each utterance
pub struct Microphone {
    stt: SpeechToText,
}

impl Microphone {
    #[must_use]
    pub const fn new(stt: SpeechToText) -> Self {
        Self { stt }
    }

    /// Record one utterance, or `None` if speech never started before the timeout
    async fn record(&self, limits: ListenLimits) -> Result<Option<Vec<f32>>, CaptureError> {
        let capture = AudioCapture::open().map_err(|e| CaptureError::Failed(e.to_string()))?;
        let mut segmenter = SpeechSegmenter::new(limits.phrase_limit);

        let started = tokio::time::Instant::now();
        let mut ticker = tokio::time::interval(POLL_INTERVAL);

        loop {
            ticker.tick().await;

            let samples = capture.take_buffer();
            match segmenter.process(&samples) {
                SegmenterState::Complete => return Ok(Some(segmenter.take_speech_buffer())),
                SegmenterState::Speaking => {}
                SegmenterState::Calibrating | SegmenterState::Waiting => {
                    if started.elapsed() >= limits.timeout {
                        return Ok(None);
                    }
                }
            }
        }
    }
}

/// Lowercase a recognizer transcript and strip surrounding punctuation ("Goodbye." becomes "goodbye")
#[must_use]
pub fn normalize_transcript(raw: &str) -> String {
    raw.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

#[async_trait(?Send)]
impl SpeechInput for Microphone {
    async fn listen(&self, limits: ListenLimits) -> Result<String, CaptureError> {
        tracing::debug!(
            timeout_secs = limits.timeout.as_secs_f32(),
            phrase_limit_secs = limits.phrase_limit.as_secs_f32(),
            "listening"
        );

        let Some(speech) = self.record(limits).await? else {
            tracing::debug!("listen timed out before speech");
            return Err(CaptureError::NoSpeech);
        };

        let wav =
            samples_to_wav(&speech, SAMPLE_RATE).map_err(|e| CaptureError::Failed(e.to_string()))?;

        let transcript = self
            .stt
            .transcribe(&wav)
            .await
            .map_err(|e| CaptureError::Unreachable(e.to_string()))?;

        let transcript = normalize_transcript(&transcript);
        if transcript.is_empty() {
            return Err(CaptureError::NoSpeech);
        }

        Ok(transcript)
    }
}
