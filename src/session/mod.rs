//! Session state machine
//!
//! One [`SessionLoop`] drives the `idle → listening → processing → speaking →
//! idle` cycle and reports every transition to a [`StatusSink`]. While a reply
//! is produced, an optional second input listens for "stop" and cancels the
//! turn's [`CancellationToken`]. That race is best-effort: a stop heard between
//! cancellation checks lets the current audio chunk finish.

pub mod interrupt;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::completion::Responder;
use crate::status::{AssistantStatus, StatusSink};
use crate::voice::{CaptureError, ListenLimits, SpeechEnd, SpeechInput, SpeechOutput};
use crate::Result;

/// Spoken before the session ends on an exit phrase
pub const FAREWELL: &str = "Goodbye, shutting down assistant.";

/// Phrases that end the session
pub const EXIT_PHRASES: &[&str] = &["exit", "goodbye", "quit", "shutdown"];

/// Delays between the steps of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Wait after a turn that produced no transcript
    pub retry_delay: Duration,
    /// Wait after a recoverable turn error
    pub error_backoff: Duration,
    /// How long a reply stays on the display before `idle`
    pub response_hold: Duration,
    /// Pause between completed turns
    pub turn_pause: Duration,
}

impl SessionTimings {
    /// No delays at all
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            error_backoff: Duration::ZERO,
            response_hold: Duration::ZERO,
            turn_pause: Duration::ZERO,
        }
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(1),
            error_backoff: Duration::from_secs(2),
            response_hold: Duration::from_secs(1),
            turn_pause: Duration::ZERO,
        }
    }
}

/// Internal session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    Processing,
    Speaking,
    Shutdown,
}

impl SessionState {
    /// Status shown on the display for this state
    #[must_use]
    pub const fn wire_status(self) -> AssistantStatus {
        match self {
            Self::Idle | Self::Shutdown => AssistantStatus::Idle,
            Self::Listening => AssistantStatus::Listening,
            Self::Processing => AssistantStatus::Processing,
            Self::Speaking => AssistantStatus::Response,
        }
    }
}

/// Result of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A reply was produced; start the next turn
    Continue,
    /// Nothing was heard; try again after the retry delay
    Retry,
    /// The session is over
    Shutdown,
}

/// State of the running session
pub struct Session {
    state: SessionState,
    last_transcript: Option<String>,
    last_response: Option<String>,
    running: bool,
    reporter: Arc<dyn StatusSink>,
}

impl Session {
    fn new(reporter: Arc<dyn StatusSink>) -> Self {
        Self {
            state: SessionState::Idle,
            last_transcript: None,
            last_response: None,
            running: false,
            reporter,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn last_transcript(&self) -> Option<&str> {
        self.last_transcript.as_deref()
    }

    #[must_use]
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Move to `next` and report it
    async fn transition(&mut self, next: SessionState, response: Option<&str>) {
        tracing::debug!(from = ?self.state, to = ?next, "session transition");
        self.state = next;
        self.reporter.report(next.wire_status(), response).await;
    }

    async fn start(&mut self) {
        self.running = true;
        self.transition(SessionState::Idle, None).await;
    }

    /// Enter the terminal state, reporting `idle` once
    async fn shut_down(&mut self) {
        if self.state != SessionState::Shutdown {
            self.transition(SessionState::Shutdown, None).await;
        }
        self.running = false;
    }
}

/// The orchestrating voice loop
pub struct SessionLoop {
    session: Session,
    input: Box<dyn SpeechInput>,
    output: Box<dyn SpeechOutput>,
    barge_in: Option<Box<dyn SpeechInput>>,
    responder: Responder,
    exit_phrases: Vec<String>,
    timings: SessionTimings,
    limits: ListenLimits,
}

impl SessionLoop {
    pub fn new(
        input: Box<dyn SpeechInput>,
        output: Box<dyn SpeechOutput>,
        responder: Responder,
        reporter: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            session: Session::new(reporter),
            input,
            output,
            barge_in: None,
            responder,
            exit_phrases: EXIT_PHRASES.iter().map(ToString::to_string).collect(),
            timings: SessionTimings::default(),
            limits: ListenLimits::default(),
        }
    }

    /// Listen for "stop" on `listener` while each reply is produced
    #[must_use]
    pub fn with_barge_in(mut self, listener: Box<dyn SpeechInput>) -> Self {
        self.barge_in = Some(listener);
        self
    }

    /// Add phrases that end the session
    #[must_use]
    pub fn with_exit_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exit_phrases
            .extend(phrases.into_iter().map(|p| p.into().trim().to_lowercase()));
        self
    }

    #[must_use]
    pub const fn with_timings(mut self, timings: SessionTimings) -> Self {
        self.timings = timings;
        self
    }

    #[must_use]
    pub const fn with_listen_limits(mut self, limits: ListenLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn is_exit_phrase(&self, transcript: &str) -> bool {
        self.exit_phrases.iter().any(|p| p == transcript)
    }

    /// Run turns until an exit phrase, end of input, a fatal error or `shutdown`
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; recoverable errors are logged and retried
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!(ai_enabled = self.responder.ai_enabled(), "session started");
        self.session.start().await;

        loop {
            let outcome = tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("shutdown requested");
                    Ok(TurnOutcome::Shutdown)
                }
                outcome = self.turn() => outcome,
            };

            let delay = match outcome {
                Ok(TurnOutcome::Continue) => self.timings.turn_pause,
                Ok(TurnOutcome::Retry) => self.timings.retry_delay,
                Ok(TurnOutcome::Shutdown) => break,
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, "fatal session error");
                    self.session.shut_down().await;
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "turn failed, resetting");
                    self.session.transition(SessionState::Idle, None).await;
                    self.timings.error_backoff
                }
            };

            if !pause(delay, &shutdown).await {
                tracing::info!("shutdown requested");
                break;
            }
        }

        self.session.shut_down().await;
        tracing::info!("session ended");
        Ok(())
    }

    /// Run a single listen/respond/speak turn
    ///
    /// # Errors
    ///
    /// Returns error if speech output fails
    #[allow(clippy::future_not_send)]
    pub async fn turn(&mut self) -> Result<TurnOutcome> {
        self.session.transition(SessionState::Listening, None).await;

        let transcript = match self.input.listen(self.limits).await {
            Ok(t) => t.trim().to_lowercase(),
            Err(CaptureError::Closed) => {
                tracing::info!("input closed");
                self.session.shut_down().await;
                return Ok(TurnOutcome::Shutdown);
            }
            Err(CaptureError::NoSpeech) => String::new(),
            Err(e) => {
                tracing::warn!(error = %e, "capture failed");
                String::new()
            }
        };

        if transcript.is_empty() {
            tracing::debug!("no transcript");
            self.session.transition(SessionState::Idle, None).await;
            return Ok(TurnOutcome::Retry);
        }

        tracing::info!(transcript = %transcript, "heard");
        self.session.last_transcript = Some(transcript.clone());

        if self.is_exit_phrase(&transcript) {
            tracing::info!(phrase = %transcript, "exit phrase received");
            if let Err(e) = self.output.speak(FAREWELL, &CancellationToken::new()).await {
                tracing::warn!(error = %e, "failed to speak farewell");
            }
            self.session.shut_down().await;
            return Ok(TurnOutcome::Shutdown);
        }

        let cancel = CancellationToken::new();
        let reply = respond_and_speak(
            &mut self.session,
            &self.responder,
            self.output.as_ref(),
            &transcript,
            &cancel,
        );

        let end = match &self.barge_in {
            None => reply.await?,
            Some(listener) => {
                let stop = interrupt::listen_for_stop(listener.as_ref(), &cancel);
                tokio::pin!(reply, stop);

                let mut listening = true;
                loop {
                    tokio::select! {
                        biased;
                        _ = &mut stop, if listening => { listening = false; }
                        end = &mut reply => break end?,
                    }
                }
            }
        };

        if end == SpeechEnd::Interrupted {
            tracing::info!("reply interrupted");
        }

        tokio::time::sleep(self.timings.response_hold).await;
        self.session.transition(SessionState::Idle, None).await;

        Ok(TurnOutcome::Continue)
    }
}

/// Produce a reply for `transcript`, report it, then speak it unless cancelled
#[allow(clippy::future_not_send)]
async fn respond_and_speak(
    session: &mut Session,
    responder: &Responder,
    output: &dyn SpeechOutput,
    transcript: &str,
    cancel: &CancellationToken,
) -> Result<SpeechEnd> {
    session.transition(SessionState::Processing, None).await;

    let reply = responder.respond(transcript).await;
    tracing::info!(source = ?reply.source, response = %reply.text, "reply ready");

    session.last_response = Some(reply.text.clone());
    session
        .transition(SessionState::Speaking, Some(&reply.text))
        .await;

    if cancel.is_cancelled() {
        tracing::debug!("stop heard before speaking, skipping output");
        return Ok(SpeechEnd::Interrupted);
    }

    output.speak(&reply.text, cancel).await
}

/// Sleep for `delay`; returns false if `shutdown` fired first
async fn pause(delay: Duration, shutdown: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !shutdown.is_cancelled();
    }

    tokio::select! {
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
