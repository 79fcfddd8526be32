//! Text stand-ins for speech, used by the demo and interactive modes

use std::collections::VecDeque;
use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{CaptureError, ListenLimits, SpeechEnd, SpeechInput, SpeechOutput};
use crate::Result;

/// Replays a fixed list of queries, then reports the input as closed
pub struct ScriptedInput {
    queries: Mutex<VecDeque<String>>,
    delay: Duration,
}

impl ScriptedInput {
    /// Queue `queries`, each delivered after `delay` of simulated listening
    pub fn new<I, S>(queries: I, delay: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: Mutex::new(queries.into_iter().map(Into::into).collect()),
            delay,
        }
    }
}

#[async_trait(?Send)]
impl SpeechInput for ScriptedInput {
    async fn listen(&self, _limits: ListenLimits) -> std::result::Result<String, CaptureError> {
        let query = self.queries.lock().await.pop_front().ok_or(CaptureError::Closed)?;

        tokio::time::sleep(self.delay).await;
        println!("\nYou: {query}");

        Ok(query.trim().to_lowercase())
    }
}

/// Reads one query per line from stdin
pub struct StdinInput {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinInput {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl SpeechInput for StdinInput {
    async fn listen(&self, _limits: ListenLimits) -> std::result::Result<String, CaptureError> {
        let mut lines = self.lines.lock().await;

        loop {
            write_prompt(&mut std::io::stdout());

            match lines.next_line().await {
                Ok(Some(line)) => {
                    let query = line.trim().to_lowercase();
                    if !query.is_empty() {
                        return Ok(query);
                    }
                }
                Ok(None) => return Err(CaptureError::Closed),
                Err(e) => return Err(CaptureError::Failed(e.to_string())),
            }
        }
    }
}

/// Print the interactive prompt; a broken terminal is logged, not fatal
fn write_prompt(out: &mut impl Write) -> bool {
    match out.write_all(b"\nYou: ").and_then(|()| out.flush()) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "failed to write prompt");
            false
        }
    }
}

/// Prints replies instead of speaking them
#[derive(Debug, Default)]
pub struct ConsoleOutput;

#[async_trait(?Send)]
impl SpeechOutput for ConsoleOutput {
    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<SpeechEnd> {
        if cancel.is_cancelled() {
            return Ok(SpeechEnd::Interrupted);
        }

        println!("Assistant: {text}");
        Ok(SpeechEnd::Finished)
    }
}
