//! Spoken output through TTS and the default output device

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{AudioPlayback, SpeechEnd, SpeechOutput, TextToSpeech};
use crate::Result;

/// Synthesizes replies and plays them aloud
pub struct Speaker {
    tts: TextToSpeech,
    playback: AudioPlayback,
}

impl Speaker {
    #[must_use]
    pub const fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self { tts, playback }
    }
}

#[async_trait(?Send)]
impl SpeechOutput for Speaker {
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<SpeechEnd> {
        if cancel.is_cancelled() {
            return Ok(SpeechEnd::Interrupted);
        }

        let audio = tokio::select! {
            () = cancel.cancelled() => return Ok(SpeechEnd::Interrupted),
            audio = self.tts.synthesize(text) => audio?,
        };

        self.playback.play_mp3(&audio, cancel).await
    }
}
