//! Barge-in: a short listen that cancels the current reply on "stop"

use tokio_util::sync::CancellationToken;

use crate::voice::{ListenLimits, SpeechInput};

/// Word that interrupts the assistant while it speaks
pub const STOP_WORD: &str = "stop";

/// Whether a transcript asks the assistant to stop talking
#[must_use]
pub fn is_stop_command(transcript: &str) -> bool {
    transcript.to_lowercase().contains(STOP_WORD)
}

/// Listen once for the stop word and cancel `cancel` if it is heard
///
/// Returns whether the turn was interrupted. Capture failures just end the
/// listen without interrupting.
pub async fn listen_for_stop(listener: &dyn SpeechInput, cancel: &CancellationToken) -> bool {
    match listener.listen(ListenLimits::STOP_WORD).await {
        Ok(transcript) if is_stop_command(&transcript) => {
            tracing::info!(transcript = %transcript, "stop command heard, interrupting");
            cancel.cancel();
            true
        }
        Ok(transcript) => {
            tracing::debug!(transcript = %transcript, "ignoring speech during reply");
            false
        }
        Err(e) => {
            tracing::trace!(error = %e, "stop listener ended");
            false
        }
    }
}
