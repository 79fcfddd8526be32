//! TOML configuration file loading
//!
//! Supports `~/.config/mirror-assistant/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AssistantConfigFile {
    /// Status display configuration
    #[serde(default)]
    pub status: StatusFileConfig,

    /// Completion model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Session pacing
    #[serde(default)]
    pub session: SessionFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Status reporting configuration
#[derive(Debug, Default, Deserialize)]
pub struct StatusFileConfig {
    /// Display base URL (e.g. `http://localhost:5000`)
    pub base_url: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,

    /// Heartbeat interval in seconds (continuous mode)
    pub heartbeat_secs: Option<u64>,

    /// Port for the local display server
    pub display_port: Option<u16>,
}

/// Completion model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Candidate Gemini models, in order of preference
    pub models: Option<Vec<String>>,

    /// Send a probe prompt to each candidate before using it
    pub probe: Option<bool>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f64>,

    /// Seconds to wait for speech to start
    pub listen_timeout_secs: Option<u64>,

    /// Maximum seconds of a single phrase
    pub phrase_limit_secs: Option<u64>,

    /// Listen for "stop" while speaking
    pub barge_in: Option<bool>,
}

/// Session pacing configuration
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Delay before retrying after an empty capture
    pub retry_delay_ms: Option<u64>,

    /// Delay after a failed turn
    pub error_backoff_ms: Option<u64>,

    /// How long a response stays on the display before `idle`
    pub response_hold_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub google: Option<String>,
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AssistantConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AssistantConfigFile {
    config_file_path().map_or_else(AssistantConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing, unreadable and malformed files all yield the defaults.
pub fn load_from(path: &Path) -> AssistantConfigFile {
    if !path.exists() {
        return AssistantConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AssistantConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AssistantConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/mirror-assistant/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("mirror-assistant").join("config.toml"))
}
