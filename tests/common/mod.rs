//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use mirror_assistant::voice::{CaptureError, ListenLimits, SpeechEnd, SpeechInput, SpeechOutput};
use mirror_assistant::{AssistantStatus, CompletionClient, Error, Result, StatusEvent, StatusSink};

/// Records every status update in order
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<AssistantStatus> {
        self.events().into_iter().map(|e| e.status).collect()
    }

    /// Response texts reported, in order
    pub fn responses(&self) -> Vec<String> {
        self.events().into_iter().filter_map(|e| e.response).collect()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn report(&self, status: AssistantStatus, response: Option<&str>) {
        self.events
            .lock()
            .unwrap()
            .push(StatusEvent::new(status, response));
    }
}

/// Replays scripted capture results, then reports the input closed
pub struct FakeInput {
    results: Mutex<VecDeque<std::result::Result<String, CaptureError>>>,
    delay: Duration,
}

impl FakeInput {
    pub fn new(results: Vec<std::result::Result<String, CaptureError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            delay: Duration::ZERO,
        }
    }

    /// Input that hears each transcript in turn
    pub fn transcripts(transcripts: &[&str]) -> Self {
        Self::new(transcripts.iter().map(|t| Ok((*t).to_string())).collect())
    }

    /// Wait `delay` before every result
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait(?Send)]
impl SpeechInput for FakeInput {
    async fn listen(&self, _limits: ListenLimits) -> std::result::Result<String, CaptureError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CaptureError::Closed))
    }
}

/// Input that never produces anything
pub struct SilentInput;

#[async_trait(?Send)]
impl SpeechInput for SilentInput {
    async fn listen(&self, _limits: ListenLimits) -> std::result::Result<String, CaptureError> {
        std::future::pending().await
    }
}

/// What a [`RecordingOutput`] was asked to say and how each call ended
pub type Spoken = Arc<Mutex<Vec<(String, SpeechEnd)>>>;

/// How a [`RecordingOutput`] behaves
#[derive(Clone)]
pub enum OutputMode {
    /// Finish immediately
    Instant,
    /// Keep "speaking" until cancelled or the duration passes
    Hold(Duration),
    /// Fail the first call with this error, then finish instantly
    FailOnce(fn() -> Error),
}

/// Records spoken text
pub struct RecordingOutput {
    spoken: Spoken,
    mode: Mutex<OutputMode>,
}

impl RecordingOutput {
    pub fn new(mode: OutputMode) -> (Self, Spoken) {
        let spoken = Spoken::default();
        let output = Self {
            spoken: Arc::clone(&spoken),
            mode: Mutex::new(mode),
        };
        (output, spoken)
    }

    pub fn instant() -> (Self, Spoken) {
        Self::new(OutputMode::Instant)
    }
}

#[async_trait(?Send)]
impl SpeechOutput for RecordingOutput {
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<SpeechEnd> {
        let mode = self.mode.lock().unwrap().clone();

        let end = match mode {
            OutputMode::Instant => SpeechEnd::Finished,
            OutputMode::Hold(duration) => {
                tokio::select! {
                    () = cancel.cancelled() => SpeechEnd::Interrupted,
                    () = tokio::time::sleep(duration) => SpeechEnd::Finished,
                }
            }
            OutputMode::FailOnce(make_error) => {
                *self.mode.lock().unwrap() = OutputMode::Instant;
                return Err(make_error());
            }
        };

        self.spoken.lock().unwrap().push((text.to_string(), end));
        Ok(end)
    }
}

/// Texts spoken so far
pub fn spoken_texts(spoken: &Spoken) -> Vec<String> {
    spoken.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
}

/// Completion client with a fixed answer or error message
pub struct FixedClient {
    answer: std::result::Result<String, String>,
}

impl FixedClient {
    pub fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(text.to_string()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
        })
    }
}

#[async_trait]
impl CompletionClient for FixedClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.answer.clone().map_err(Error::Completion)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
