//! Google Gemini `generateContent` client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::CompletionClient;
use crate::{Error, Result};

/// Gemini REST API base
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Prompt sent when probing a candidate model
const PROBE_PROMPT: &str = "Hello";

/// Text completions via Gemini
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for a single model
    #[must_use]
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model this client talks to
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Try each candidate model in order and keep the first that answers
    ///
    /// Returns `None` when no candidate answers; the caller then runs in fallback mode.
    pub async fn probe(api_key: &SecretString, models: &[String]) -> Option<Self> {
        for model in models {
            let client = Self::new(SecretString::from(api_key.expose_secret().to_string()), model.clone());
            match client.complete(PROBE_PROMPT).await {
                Ok(_) => {
                    tracing::debug!(model = %model, "Gemini model answered probe");
                    return Some(client);
                }
                Err(e) => tracing::warn!(model = %model, error = %e, "Gemini model unavailable"),
            }
        }

        tracing::warn!("no Gemini model available, using fallback responses");
        None
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Completion(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!("Gemini API error {status}: {body}")));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(format!("failed to parse Gemini response: {e}")))?;

        let text = result.text().ok_or_else(|| {
            Error::Completion("Gemini response contained no text".to_string())
        })?;

        tracing::debug!(model = %self.model, response_len = text.len(), "completion received");
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}
