//! Configuration management for the mirror assistant
//!
//! Values resolve env > TOML file > built-in default.

pub mod file;

use std::time::Duration;

use secrecy::SecretString;

use crate::session::SessionTimings;
use file::AssistantConfigFile;

/// Default display base URL
pub const DEFAULT_STATUS_URL: &str = "http://localhost:5000";

/// Default Gemini candidates, tried in order
pub const DEFAULT_GEMINI_MODELS: &[&str] = &["gemini-1.5-flash", "gemini-1.0-pro", "gemini-pro"];

/// Assistant configuration
#[derive(Debug)]
pub struct Config {
    /// Status display configuration
    pub status: StatusConfig,

    /// Completion model configuration
    pub llm: LlmConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// Session pacing
    pub session: SessionTimings,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Status display configuration
#[derive(Debug, Clone)]
pub struct StatusConfig {
    /// Base URL of the display; updates go to `{base_url}/assistant/status`
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Interval between `idle` heartbeats in continuous mode
    pub heartbeat_interval: Duration,

    /// Port the local display server binds to
    pub display_port: u16,
}

/// Completion model configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Candidate models, most preferred first
    pub models: Vec<String>,

    /// Verify each candidate with a probe prompt before use
    pub probe: bool,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1", "`eleven_monolingual_v1`")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f64,

    /// How long to wait for speech to start
    pub listen_timeout: Duration,

    /// Longest phrase captured in one go
    pub phrase_limit: Duration,

    /// Listen for "stop" while the assistant speaks
    pub barge_in: bool,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// Google AI Studio key (Gemini completions)
    pub google: Option<SecretString>,

    /// `OpenAI` key (Whisper STT and TTS)
    pub openai: Option<SecretString>,

    /// Deepgram key (optional STT)
    pub deepgram: Option<SecretString>,

    /// `ElevenLabs` key (optional TTS)
    pub elevenlabs: Option<SecretString>,
}

impl Config {
    /// Load configuration from the process environment and the config file
    #[must_use]
    pub fn load() -> Self {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed config file and an environment lookup
    pub fn from_sources(fc: AssistantConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str, fallback: Option<String>| {
            env(key)
                .or(fallback)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            google: secret("GOOGLE_API_KEY", fc.api_keys.google),
            openai: secret("OPENAI_API_KEY", fc.api_keys.openai),
            deepgram: secret("DEEPGRAM_API_KEY", fc.api_keys.deepgram),
            elevenlabs: secret("ELEVENLABS_API_KEY", fc.api_keys.elevenlabs),
        };

        let status = StatusConfig {
            base_url: env("ASSISTANT_STATUS_URL")
                .or(fc.status.base_url)
                .unwrap_or_else(|| DEFAULT_STATUS_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_millis(fc.status.timeout_ms.unwrap_or(2000)),
            heartbeat_interval: Duration::from_secs(fc.status.heartbeat_secs.unwrap_or(5)),
            display_port: env("ASSISTANT_DISPLAY_PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.status.display_port)
                .unwrap_or(5000),
        };

        let models = env("ASSISTANT_GEMINI_MODELS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|m| !m.is_empty())
            .or(fc.llm.models)
            .unwrap_or_else(|| DEFAULT_GEMINI_MODELS.iter().map(ToString::to_string).collect());

        let llm = LlmConfig {
            models,
            probe: fc.llm.probe.unwrap_or(true),
        };

        // Deepgram and ElevenLabs defaults only apply when OpenAI is absent
        let openai_absent = api_keys.openai.is_none();
        let default_stt = if openai_absent && api_keys.deepgram.is_some() {
            "nova-2"
        } else {
            "whisper-1"
        };
        let default_tts = if openai_absent && api_keys.elevenlabs.is_some() {
            "eleven_monolingual_v1"
        } else {
            "tts-1"
        };

        let voice = VoiceConfig {
            stt_model: env("ASSISTANT_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt.to_string()),
            tts_model: env("ASSISTANT_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts.to_string()),
            tts_voice: env("ASSISTANT_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0).clamp(0.25, 4.0),
            listen_timeout: Duration::from_secs(fc.voice.listen_timeout_secs.unwrap_or(5)),
            phrase_limit: Duration::from_secs(fc.voice.phrase_limit_secs.unwrap_or(5)),
            barge_in: fc.voice.barge_in.unwrap_or(true),
        };

        let defaults = SessionTimings::default();
        let session = SessionTimings {
            retry_delay: fc
                .session
                .retry_delay_ms
                .map_or(defaults.retry_delay, Duration::from_millis),
            error_backoff: fc
                .session
                .error_backoff_ms
                .map_or(defaults.error_backoff, Duration::from_millis),
            response_hold: fc
                .session
                .response_hold_ms
                .map_or(defaults.response_hold, Duration::from_millis),
            turn_pause: defaults.turn_pause,
        };

        Self {
            status,
            llm,
            voice,
            session,
            api_keys,
        }
    }

    /// Whether a completion service is configured
    #[must_use]
    pub const fn ai_enabled(&self) -> bool {
        self.api_keys.google.is_some()
    }
}
