//! Session status reporting to the mirror display
//!
//! Reporting is best-effort: every failure is logged and swallowed, nothing is
//! retried or queued. A dropped update is lost and the session carries on.

pub mod display;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Path appended to the display base URL
pub const STATUS_PATH: &str = "/assistant/status";

/// Status values understood by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantStatus {
    /// Nothing in progress
    Idle,
    /// Capturing speech
    Listening,
    /// Waiting on the reply
    Processing,
    /// Reply available (carries the text)
    Response,
}

impl AssistantStatus {
    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Response => "response",
        }
    }
}

impl std::fmt::Display for AssistantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single status update as sent over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: AssistantStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl StatusEvent {
    /// Build an event; empty response text is dropped
    #[must_use]
    pub fn new(status: AssistantStatus, response: Option<&str>) -> Self {
        Self {
            status,
            response: response.filter(|r| !r.is_empty()).map(ToString::to_string),
        }
    }
}

/// Receives session status transitions
///
/// Implementations must not fail: a sink that cannot deliver logs and returns.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Report the current status, with reply text for [`AssistantStatus::Response`]
    async fn report(&self, status: AssistantStatus, response: Option<&str>);
}

/// Posts status updates to `{base_url}/assistant/status`
pub struct HttpStatusReporter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStatusReporter {
    /// Create a reporter for the given display base URL
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = format!("{}{STATUS_PATH}", base_url.trim_end_matches('/'));

        tracing::debug!(endpoint = %endpoint, timeout_ms = timeout.as_millis(), "status reporter initialized");

        Ok(Self { client, endpoint })
    }

    /// Full URL updates are posted to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, event: &StatusEvent) -> crate::Result<()> {
        let response = self.client.post(&self.endpoint).json(event).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(crate::Error::Status(format!(
                "display rejected update: {status}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl StatusSink for HttpStatusReporter {
    async fn report(&self, status: AssistantStatus, response: Option<&str>) {
        let event = StatusEvent::new(status, response);

        match self.send(&event).await {
            Ok(()) => tracing::debug!(status = %status, "status sent"),
            Err(e) => tracing::warn!(status = %status, error = %e, "failed to send status"),
        }
    }
}

/// Report `idle` on a fixed interval until `shutdown` is cancelled
///
/// Sends one final `idle` on the way out.
pub async fn heartbeat(sink: &dyn StatusSink, interval: Duration, shutdown: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs_f32(), "heartbeat started");

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => sink.report(AssistantStatus::Idle, None).await,
        }
    }

    sink.report(AssistantStatus::Idle, None).await;
    tracing::info!("heartbeat stopped");
}
