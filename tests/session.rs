//! Session loop integration tests
//!
//! Drive the state machine with scripted input and check what reaches the display

use std::sync::Arc;
use std::time::Duration;

use mirror_assistant::completion::APOLOGY;
use mirror_assistant::fallback::{JOKE_REPLY, WEATHER_REPLY};
use mirror_assistant::session::FAREWELL;
use mirror_assistant::voice::{CaptureError, SpeechEnd, normalize_transcript};
use mirror_assistant::{
    AssistantStatus, Error, HttpStatusReporter, Responder, SessionLoop, SessionState,
    SessionTimings, TurnOutcome,
};
use tokio_util::sync::CancellationToken;

mod common;
use common::{
    FakeInput, FixedClient, OutputMode, RecordingOutput, RecordingSink, SilentInput, spoken_texts,
};

use AssistantStatus::{Idle, Listening, Processing, Response};

fn session_with(
    input: FakeInput,
    output: RecordingOutput,
    responder: Responder,
    sink: &Arc<RecordingSink>,
) -> SessionLoop {
    SessionLoop::new(Box::new(input), Box::new(output), responder, sink.clone())
        .with_timings(SessionTimings::immediate())
}

#[tokio::test]
async fn test_no_transcript_returns_to_idle() {
    for failure in [
        CaptureError::NoSpeech,
        CaptureError::Unreachable("dns failure".to_string()),
        CaptureError::Failed("device busy".to_string()),
    ] {
        let sink = RecordingSink::new();
        let (output, spoken) = RecordingOutput::instant();
        let mut session = session_with(
            FakeInput::new(vec![Err(failure)]),
            output,
            Responder::fallback_only(),
            &sink,
        );

        assert_eq!(session.turn().await.unwrap(), TurnOutcome::Retry);
        assert_eq!(sink.statuses(), vec![Listening, Idle]);
        assert!(spoken_texts(&spoken).is_empty());
        assert!(session.session().last_transcript().is_none());
    }
}

#[tokio::test]
async fn test_blank_transcript_is_no_transcript() {
    let sink = RecordingSink::new();
    let (output, _) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::transcripts(&["   "]),
        output,
        Responder::fallback_only(),
        &sink,
    );

    assert_eq!(session.turn().await.unwrap(), TurnOutcome::Retry);
    assert_eq!(sink.statuses(), vec![Listening, Idle]);
}

#[tokio::test]
async fn test_exit_phrases_shut_down() {
    for phrase in ["exit", "goodbye", "quit", "shutdown", "  QUIT  "] {
        let sink = RecordingSink::new();
        let (output, spoken) = RecordingOutput::instant();
        let mut session = session_with(
            FakeInput::transcripts(&[phrase]),
            output,
            Responder::fallback_only(),
            &sink,
        );

        assert_eq!(session.turn().await.unwrap(), TurnOutcome::Shutdown, "{phrase}");
        assert_eq!(sink.statuses(), vec![Listening, Idle]);
        assert_eq!(spoken_texts(&spoken), vec![FAREWELL.to_string()]);
        assert_eq!(session.session().state(), SessionState::Shutdown);
    }
}

#[tokio::test]
async fn test_punctuated_exit_phrase_shuts_down() {
    for recognized in ["Goodbye.", "Exit!", "quit?"] {
        let sink = RecordingSink::new();
        let (output, spoken) = RecordingOutput::instant();
        let transcript = normalize_transcript(recognized);
        let mut session = session_with(
            FakeInput::transcripts(&[transcript.as_str()]),
            output,
            Responder::fallback_only(),
            &sink,
        );

        assert_eq!(session.turn().await.unwrap(), TurnOutcome::Shutdown, "{recognized}");
        assert_eq!(sink.statuses(), vec![Listening, Idle]);
        assert_eq!(spoken_texts(&spoken), vec![FAREWELL.to_string()]);
    }
}

#[tokio::test]
async fn test_exit_phrase_must_match_exactly() {
    let sink = RecordingSink::new();
    let (output, _) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::transcripts(&["please exit now"]),
        output,
        Responder::fallback_only(),
        &sink,
    );

    assert_eq!(session.turn().await.unwrap(), TurnOutcome::Continue);
    assert_eq!(sink.statuses(), vec![Listening, Processing, Response, Idle]);
}

#[tokio::test]
async fn test_extra_exit_phrase() {
    let sink = RecordingSink::new();
    let (output, _) = RecordingOutput::instant();
    let mut plain = session_with(
        FakeInput::transcripts(&["bye"]),
        output,
        Responder::fallback_only(),
        &sink,
    );
    assert_eq!(plain.turn().await.unwrap(), TurnOutcome::Continue);

    let sink = RecordingSink::new();
    let (output, _) = RecordingOutput::instant();
    let mut interactive = session_with(
        FakeInput::transcripts(&["bye"]),
        output,
        Responder::fallback_only(),
        &sink,
    )
    .with_exit_phrases(["Bye"]);
    assert_eq!(interactive.turn().await.unwrap(), TurnOutcome::Shutdown);
}

#[tokio::test]
async fn test_joke_without_ai() {
    let sink = RecordingSink::new();
    let (output, spoken) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::transcripts(&["tell me a joke"]),
        output,
        Responder::fallback_only(),
        &sink,
    );

    assert_eq!(session.turn().await.unwrap(), TurnOutcome::Continue);
    assert_eq!(sink.statuses(), vec![Listening, Processing, Response, Idle]);
    assert_eq!(sink.responses(), vec![JOKE_REPLY.to_string()]);
    assert_eq!(spoken_texts(&spoken), vec![JOKE_REPLY.to_string()]);

    assert_eq!(session.session().last_transcript(), Some("tell me a joke"));
    assert_eq!(session.session().last_response(), Some(JOKE_REPLY));
    assert_eq!(session.session().state(), SessionState::Idle);
}

#[tokio::test]
async fn test_time_without_ai() {
    let sink = RecordingSink::new();
    let (output, _) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::transcripts(&["what time is it"]),
        output,
        Responder::fallback_only(),
        &sink,
    );

    session.turn().await.unwrap();

    let responses = sink.responses();
    assert_eq!(responses.len(), 1);
    let reply = &responses[0];
    assert!(reply.starts_with("The current time is "));
    assert!(reply.contains(" AM.") || reply.contains(" PM."), "{reply}");

    // "HH:MM" right before the meridiem
    let clock = &reply["The current time is ".len().."The current time is ".len() + 5];
    assert_eq!(clock.as_bytes()[2], b':');
    assert!(clock.chars().filter(char::is_ascii_digit).count() == 4);
}

#[tokio::test]
async fn test_ai_reply_is_reported_and_spoken() {
    let sink = RecordingSink::new();
    let (output, spoken) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::transcripts(&["who are you"]),
        output,
        Responder::new(FixedClient::answering("I am your **mirror** assistant.")),
        &sink,
    );

    session.turn().await.unwrap();
    assert_eq!(sink.responses(), vec!["I am your mirror assistant.".to_string()]);
    assert_eq!(
        spoken_texts(&spoken),
        vec!["I am your mirror assistant.".to_string()]
    );
}

#[tokio::test]
async fn test_quota_errors_use_fallback() {
    for message in ["Gemini API error 429 Too Many Requests: {}", "Quota exceeded for project"] {
        let sink = RecordingSink::new();
        let (output, _) = RecordingOutput::instant();
        let mut session = session_with(
            FakeInput::transcripts(&["how is the weather"]),
            output,
            Responder::new(FixedClient::failing(message)),
            &sink,
        );

        session.turn().await.unwrap();
        assert_eq!(sink.responses(), vec![WEATHER_REPLY.to_string()], "{message}");
    }
}

#[tokio::test]
async fn test_generic_error_uses_apology() {
    let sink = RecordingSink::new();
    let (output, spoken) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::transcripts(&["how is the weather"]),
        output,
        Responder::new(FixedClient::failing("Gemini API error 500: internal")),
        &sink,
    );

    assert_eq!(session.turn().await.unwrap(), TurnOutcome::Continue);
    assert_eq!(sink.statuses(), vec![Listening, Processing, Response, Idle]);
    assert_eq!(sink.responses(), vec![APOLOGY.to_string()]);
    assert_eq!(spoken_texts(&spoken), vec![APOLOGY.to_string()]);
}

#[tokio::test]
async fn test_stop_before_speaking_skips_output() {
    let sink = RecordingSink::new();
    let (output, spoken) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::transcripts(&["tell me a joke"]),
        output,
        Responder::fallback_only(),
        &sink,
    )
    .with_barge_in(Box::new(FakeInput::transcripts(&["stop"])));

    assert_eq!(session.turn().await.unwrap(), TurnOutcome::Continue);
    assert!(spoken_texts(&spoken).is_empty());
    // The reply still reaches the display
    assert_eq!(sink.statuses(), vec![Listening, Processing, Response, Idle]);
    assert_eq!(sink.responses(), vec![JOKE_REPLY.to_string()]);
}

#[tokio::test]
async fn test_stop_interrupts_speech() {
    let sink = RecordingSink::new();
    let (output, spoken) = RecordingOutput::new(OutputMode::Hold(Duration::from_secs(5)));
    let listener = FakeInput::transcripts(&["please stop"]).with_delay(Duration::from_millis(50));
    let mut session = session_with(
        FakeInput::transcripts(&["tell me a joke"]),
        output,
        Responder::fallback_only(),
        &sink,
    )
    .with_barge_in(Box::new(listener));

    let started = tokio::time::Instant::now();
    assert_eq!(session.turn().await.unwrap(), TurnOutcome::Continue);
    assert!(started.elapsed() < Duration::from_secs(2));

    let spoken = spoken.lock().unwrap().clone();
    assert_eq!(spoken, vec![(JOKE_REPLY.to_string(), SpeechEnd::Interrupted)]);
    assert_eq!(sink.statuses().last(), Some(&Idle));
}

#[tokio::test]
async fn test_other_speech_does_not_interrupt() {
    let sink = RecordingSink::new();
    let (output, spoken) = RecordingOutput::new(OutputMode::Hold(Duration::from_millis(100)));
    let mut session = session_with(
        FakeInput::transcripts(&["tell me a joke"]),
        output,
        Responder::fallback_only(),
        &sink,
    )
    .with_barge_in(Box::new(FakeInput::transcripts(&["haha"])));

    session.turn().await.unwrap();

    let spoken = spoken.lock().unwrap().clone();
    assert_eq!(spoken, vec![(JOKE_REPLY.to_string(), SpeechEnd::Finished)]);
}

#[tokio::test]
async fn test_run_until_exit_phrase() {
    let sink = RecordingSink::new();
    let (output, spoken) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::new(vec![
            Err(CaptureError::NoSpeech),
            Ok("tell me a joke".to_string()),
            Ok("goodbye".to_string()),
        ]),
        output,
        Responder::fallback_only(),
        &sink,
    );

    session.run(CancellationToken::new()).await.unwrap();

    assert_eq!(
        sink.statuses(),
        vec![
            Idle, // start
            Listening, Idle, // nothing heard
            Listening, Processing, Response, Idle, // joke
            Listening, Idle, // goodbye
        ]
    );
    assert_eq!(
        spoken_texts(&spoken),
        vec![JOKE_REPLY.to_string(), FAREWELL.to_string()]
    );
    assert!(!session.session().is_running());
}

#[tokio::test]
async fn test_run_stops_at_end_of_input() {
    let sink = RecordingSink::new();
    let (output, spoken) = RecordingOutput::instant();
    let mut session = session_with(
        FakeInput::transcripts(&["tell me a joke"]),
        output,
        Responder::fallback_only(),
        &sink,
    );

    session.run(CancellationToken::new()).await.unwrap();

    assert_eq!(
        sink.statuses(),
        vec![Idle, Listening, Processing, Response, Idle, Listening, Idle]
    );
    // No farewell when the input simply runs out
    assert_eq!(spoken_texts(&spoken), vec![JOKE_REPLY.to_string()]);
    assert_eq!(session.session().state(), SessionState::Shutdown);
}

#[tokio::test]
async fn test_shutdown_token_abandons_turn() {
    let sink = RecordingSink::new();
    let (output, _) = RecordingOutput::instant();
    let mut session = SessionLoop::new(
        Box::new(SilentInput),
        Box::new(output),
        Responder::fallback_only(),
        sink.clone(),
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), session.run(shutdown))
        .await
        .expect("session should stop on shutdown")
        .unwrap();

    assert_eq!(sink.statuses(), vec![Idle, Listening, Idle]);
    assert_eq!(session.session().state(), SessionState::Shutdown);
}

#[tokio::test]
async fn test_recoverable_error_continues() {
    let sink = RecordingSink::new();
    let (output, spoken) =
        RecordingOutput::new(OutputMode::FailOnce(|| Error::Tts("synthesis failed".to_string())));
    let mut session = session_with(
        FakeInput::transcripts(&["tell me a joke", "tell me a joke"]),
        output,
        Responder::fallback_only(),
        &sink,
    );

    session.run(CancellationToken::new()).await.unwrap();

    assert_eq!(
        sink.statuses(),
        vec![
            Idle,
            Listening, Processing, Response, Idle, // failed turn, reset
            Listening, Processing, Response, Idle,
            Listening, Idle, // end of input
        ]
    );
    assert_eq!(spoken_texts(&spoken), vec![JOKE_REPLY.to_string()]);
}

#[tokio::test]
async fn test_fatal_error_ends_session() {
    let sink = RecordingSink::new();
    let (output, _) =
        RecordingOutput::new(OutputMode::FailOnce(|| Error::Config("no output device".to_string())));
    let mut session = session_with(
        FakeInput::transcripts(&["tell me a joke", "tell me a joke"]),
        output,
        Responder::fallback_only(),
        &sink,
    );

    let err = session.run(CancellationToken::new()).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(sink.statuses().last(), Some(&Idle));
    assert_eq!(session.session().state(), SessionState::Shutdown);
}

#[tokio::test]
async fn test_unreachable_display_does_not_stop_session() {
    // Nothing listens on the discard port
    let reporter =
        Arc::new(HttpStatusReporter::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap());
    let (output, spoken) = RecordingOutput::instant();
    let mut session = SessionLoop::new(
        Box::new(FakeInput::transcripts(&["tell me a joke", "exit"])),
        Box::new(output),
        Responder::fallback_only(),
        reporter,
    )
    .with_timings(SessionTimings::immediate());

    session.run(CancellationToken::new()).await.unwrap();

    assert_eq!(
        spoken_texts(&spoken),
        vec![JOKE_REPLY.to_string(), FAREWELL.to_string()]
    );
}
