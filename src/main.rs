use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use mirror_assistant::session::EXIT_PHRASES;
use mirror_assistant::status::{self, display};
use mirror_assistant::voice::{
    AudioCapture, AudioPlayback, ConsoleOutput, ListenLimits, Microphone, ScriptedInput, Speaker,
    SpeechOutput, SpeechToText, StdinInput, TextToSpeech, calculate_energy,
};
use mirror_assistant::{
    Config, Error, GeminiClient, HttpStatusReporter, Responder, SessionLoop, SessionTimings,
    StatusSink,
};

/// Queries replayed by demo mode
const DEMO_QUERIES: &[&str] = &[
    "What time is it?",
    "Tell me about the weather",
    "What's happening in the news?",
    "Tell me a joke",
    "What can you help me with?",
];

/// Mirror Assistant - voice assistant bridge for a smart-mirror display
#[derive(Parser)]
#[command(name = "mirror-assistant", version, about)]
struct Cli {
    /// Display base URL; status updates go to {url}/assistant/status
    #[arg(long, env = "ASSISTANT_STATUS_URL")]
    status_url: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Voice session: microphone in, speech out (default)
    Voice,
    /// Report `idle` periodically until interrupted
    Heartbeat,
    /// Replay a fixed list of queries through the session
    Demo,
    /// Type queries on stdin
    Interactive,
    /// Serve the display endpoint locally
    Display {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,mirror_assistant=info",
        1 => "info,mirror_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(url) = cli.status_url {
        config.status.base_url = url.trim_end_matches('/').to_string();
    }
    tracing::debug!(?config, ai_enabled = config.ai_enabled(), "loaded configuration");

    let command = cli.command.unwrap_or(Command::Voice);
    match command {
        Command::Voice => run_voice(&config).await,
        Command::Heartbeat => run_heartbeat(&config).await,
        Command::Demo => run_demo(&config).await,
        Command::Interactive => run_interactive(&config).await,
        Command::Display { port } => {
            let port = port.unwrap_or(config.status.display_port);
            display::serve(port, shutdown_on_ctrl_c()).await?;
            Ok(())
        }
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

/// Cancel the returned token on Ctrl-C
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl-C, shutting down");
            trigger.cancel();
        }
    });

    token
}

fn status_reporter(config: &Config) -> anyhow::Result<Arc<dyn StatusSink>> {
    let reporter = HttpStatusReporter::new(&config.status.base_url, config.status.timeout)?;
    tracing::info!(endpoint = reporter.endpoint(), "reporting status");
    Ok(Arc::new(reporter))
}

/// Build the responder, probing Gemini models when a key is configured
async fn build_responder(config: &Config) -> Responder {
    let Some(key) = &config.api_keys.google else {
        tracing::info!("GOOGLE_API_KEY not set, using fallback responses");
        return Responder::fallback_only();
    };

    let client = if config.llm.probe {
        GeminiClient::probe(key, &config.llm.models).await
    } else {
        config.llm.models.first().map(|model| {
            GeminiClient::new(SecretString::from(key.expose_secret().to_string()), model.clone())
        })
    };

    match client {
        Some(client) => {
            tracing::info!(model = client.model(), "AI responses enabled");
            Responder::new(Arc::new(client))
        }
        None => Responder::fallback_only(),
    }
}

#[allow(clippy::future_not_send)]
async fn run_voice(config: &Config) -> anyhow::Result<()> {
    let stt = SpeechToText::from_keys(&config.api_keys, &config.voice.stt_model).ok_or_else(|| {
        Error::Config("voice mode requires OPENAI_API_KEY or DEEPGRAM_API_KEY for speech recognition".to_string())
    })?;

    let output: Box<dyn SpeechOutput> = match TextToSpeech::from_keys(&config.api_keys, &config.voice) {
        Some(tts) => Box::new(Speaker::new(tts, AudioPlayback::new()?)),
        None => {
            tracing::warn!("no TTS key configured, TTS disabled; replies are printed");
            Box::new(ConsoleOutput)
        }
    };

    let reporter = status_reporter(config)?;
    let responder = build_responder(config).await;

    let mut session = SessionLoop::new(Box::new(Microphone::new(stt)), output, responder, reporter)
        .with_timings(config.session)
        .with_listen_limits(ListenLimits::new(
            config.voice.listen_timeout,
            config.voice.phrase_limit,
        ));

    if config.voice.barge_in
        && let Some(stop_stt) = SpeechToText::from_keys(&config.api_keys, &config.voice.stt_model)
    {
        session = session.with_barge_in(Box::new(Microphone::new(stop_stt)));
    }

    tracing::info!("assistant ready, say \"{}\" to exit", EXIT_PHRASES.join("\", \""));
    session.run(shutdown_on_ctrl_c()).await?;
    Ok(())
}

async fn run_heartbeat(config: &Config) -> anyhow::Result<()> {
    let reporter = status_reporter(config)?;
    status::heartbeat(
        reporter.as_ref(),
        config.status.heartbeat_interval,
        shutdown_on_ctrl_c(),
    )
    .await;
    Ok(())
}

#[allow(clippy::future_not_send)]
async fn run_demo(config: &Config) -> anyhow::Result<()> {
    let reporter = status_reporter(config)?;
    let responder = build_responder(config).await;

    let timings = SessionTimings {
        response_hold: Duration::from_secs(5),
        turn_pause: Duration::from_secs(3),
        ..config.session
    };

    let input = ScriptedInput::new(DEMO_QUERIES.iter().copied(), Duration::from_secs(2));
    let mut session = SessionLoop::new(Box::new(input), Box::new(ConsoleOutput), responder, reporter)
        .with_timings(timings);

    tracing::info!(queries = DEMO_QUERIES.len(), "running demo");
    session.run(shutdown_on_ctrl_c()).await?;
    Ok(())
}

#[allow(clippy::future_not_send)]
async fn run_interactive(config: &Config) -> anyhow::Result<()> {
    let reporter = status_reporter(config)?;
    let responder = build_responder(config).await;

    let timings = SessionTimings {
        response_hold: Duration::from_secs(2),
        ..config.session
    };

    println!("Type your questions (or 'quit' to exit):");

    let mut session =
        SessionLoop::new(Box::new(StdinInput::new()), Box::new(ConsoleOutput), responder, reporter)
            .with_timings(timings)
            .with_exit_phrases(["bye"]);

    session.run(shutdown_on_ctrl_c()).await?;
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let capture = AudioCapture::open()?;
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 24000_u16;
    let frequency = 440.0_f32;
    let samples: Vec<f32> = (0..u32::from(sample_rate) * 2)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / f32::from(sample_rate);
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);
    playback.play(samples, &shutdown_on_ctrl_c()).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS output
#[allow(clippy::future_not_send)]
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = TextToSpeech::from_keys(&config.api_keys, &config.voice).ok_or_else(|| {
        Error::Config("TTS requires OPENAI_API_KEY or ELEVENLABS_API_KEY".to_string())
    })?;

    let speaker = Speaker::new(tts, AudioPlayback::new()?);
    let end = speaker.speak(text, &shutdown_on_ctrl_c()).await?;

    println!("\n---");
    println!("Playback ended: {end:?}");

    Ok(())
}
