//! Mirror Assistant - voice assistant bridge for a smart-mirror display
//!
//! This library provides:
//! - A session state machine (listen, think, speak) with "stop" barge-in
//! - Gemini completions with a keyword fallback for degraded mode
//! - Fire-and-forget status reporting to the mirror display
//! - Voice I/O (microphone capture, STT, TTS, playback)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Session Loop                       │
//! │   idle → listening → processing → speaking → idle    │
//! └──────┬──────────────────┬─────────────────┬─────────┘
//!        │                  │                 │
//! ┌──────▼──────┐   ┌───────▼───────┐  ┌──────▼───────┐
//! │ SpeechInput │   │   Responder   │  │  StatusSink  │
//! │ SpeechOutput│   │ Gemini/Fallbk │  │ POST /status │
//! └─────────────┘   └───────────────┘  └──────────────┘
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod fallback;
pub mod session;
pub mod status;
pub mod voice;

pub use completion::{CompletionClient, GeminiClient, Reply, ReplySource, Responder};
pub use config::Config;
pub use error::{Error, Result};
pub use session::{SessionLoop, SessionState, SessionTimings, TurnOutcome};
pub use status::{AssistantStatus, HttpStatusReporter, StatusEvent, StatusSink};
