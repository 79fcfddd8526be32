//! Local display endpoint
//!
//! Serves the receiving side of the status contract so the assistant can be
//! run and inspected without the mirror UI.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{AssistantStatus, STATUS_PATH, StatusEvent};
use crate::{Error, Result};

/// Latest status seen by the display
#[derive(Debug, Clone, Serialize)]
pub struct DisplayState {
    #[serde(flatten)]
    pub event: StatusEvent,
    /// When the event was received
    pub updated_at: DateTime<Utc>,
    /// Number of updates received since start
    pub updates: u64,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            event: StatusEvent::new(AssistantStatus::Idle, None),
            updated_at: Utc::now(),
            updates: 0,
        }
    }
}

/// Shared display state
pub type SharedDisplay = Arc<RwLock<DisplayState>>;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Acknowledgement for a status update
#[derive(Serialize)]
struct Ack {
    ok: bool,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn receive_status(
    State(display): State<SharedDisplay>,
    Json(event): Json<StatusEvent>,
) -> Json<Ack> {
    match &event.response {
        Some(text) => tracing::info!(status = %event.status, response = %text, "display update"),
        None => tracing::info!(status = %event.status, "display update"),
    }

    let mut state = display.write().await;
    state.event = event;
    state.updated_at = Utc::now();
    state.updates += 1;

    Json(Ack { ok: true })
}

async fn current_status(State(display): State<SharedDisplay>) -> Json<DisplayState> {
    Json(display.read().await.clone())
}

/// Build the display router
pub fn router(display: SharedDisplay) -> Router {
    Router::new()
        .route(STATUS_PATH, get(current_status).post(receive_status))
        .route("/health", get(health))
        .with_state(display)
}

/// Serve the display until `shutdown` is cancelled
///
/// # Errors
///
/// Returns error if the listener cannot bind or the server fails
pub async fn serve(port: u16, shutdown: CancellationToken) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(port, "display server listening");

    axum::serve(listener, router(SharedDisplay::default()))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Error::Status(format!("display server error: {e}")))?;

    Ok(())
}
