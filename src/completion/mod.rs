//! Reply generation
//!
//! A [`Responder`] turns a query into exactly one reply: the completion
//! service's answer, a canned fallback, or a fixed apology.

mod gemini;

pub use gemini::GeminiClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Result, fallback};

/// Spoken and reported when the completion service fails
pub const APOLOGY: &str = "Sorry, I encountered an error processing your request.";

/// A generative text service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete a prompt
    ///
    /// # Errors
    ///
    /// Returns error if the service fails; quota and rate-limit failures must
    /// mention `quota` or `429` in their message
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Client name for logging
    fn name(&self) -> &str;
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Completion service answer
    Ai,
    /// Canned fallback table
    Fallback,
    /// Fixed apology after a completion error
    Apology,
}

/// A reply ready to be reported and spoken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    fn new(text: impl Into<String>, source: ReplySource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// Produces replies, with the completion service optional
#[derive(Clone, Default)]
pub struct Responder {
    client: Option<Arc<dyn CompletionClient>>,
}

impl Responder {
    /// Responder backed by a completion service
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Responder that only uses the fallback table
    #[must_use]
    pub fn fallback_only() -> Self {
        Self { client: None }
    }

    /// Whether a completion service is attached
    #[must_use]
    pub fn ai_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Produce a reply; never fails
    pub async fn respond(&self, query: &str) -> Reply {
        let Some(client) = &self.client else {
            return Reply::new(fallback::respond(query), ReplySource::Fallback);
        };

        match client.complete(query).await {
            Ok(text) => Reply::new(sanitize(&text), ReplySource::Ai),
            Err(e) if e.is_quota() => {
                tracing::warn!(client = client.name(), error = %e, "completion quota exceeded, using fallback");
                Reply::new(fallback::respond(query), ReplySource::Fallback)
            }
            Err(e) => {
                tracing::error!(client = client.name(), error = %e, "completion failed");
                Reply::new(APOLOGY, ReplySource::Apology)
            }
        }
    }
}

/// Strip markdown emphasis and surrounding whitespace before speaking
#[must_use]
pub fn sanitize(text: &str) -> String {
    text.replace('*', "").trim().to_string()
}
