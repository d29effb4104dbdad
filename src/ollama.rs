//! Client for the Ollama `/api/generate` endpoint.

use std::fmt::Write;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::types::ContextLine;

/// Hard deadline for one generation call, connection included.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

const CONTEXT_HEADER: &str = "Recent conversation:";
const LIVE_WEATHER_HEADER: &str = "Live weather data:";

const PERSONA: &str = "You are a friendly, knowledgeable assistant chatting in a Discord server. \
    Answer conversationally and concisely, and use Discord markdown when it helps readability.";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    system: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Something that turns a user prompt plus conversation context into a reply.
pub trait ResponseGenerator: Sync {
    /// Generate a reply to `prompt` from `username`.
    ///
    /// `live_data` is an optional pre-formatted block of real-time facts
    /// (e.g. current weather) the model should use.
    fn generate(
        &self,
        prompt: &str,
        username: &str,
        context: &[ContextLine],
        live_data: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Builds the `prompt` field: optional context block, optional live data, then the user's line.
#[must_use]
pub fn build_prompt(
    prompt: &str,
    username: &str,
    context: &[ContextLine],
    live_data: Option<&str>,
) -> String {
    let mut composed = String::new();

    if !context.is_empty() {
        composed.push_str(CONTEXT_HEADER);
        composed.push('\n');
        for line in context {
            let _ = writeln!(composed, "{line}");
        }
        composed.push('\n');
    }

    if let Some(data) = live_data {
        let _ = write!(composed, "{LIVE_WEATHER_HEADER}\n{data}\n\n");
    }

    let _ = write!(composed, "{username}: {prompt}");
    composed
}

/// Builds the system instruction naming the assistant's persona and the current user.
#[must_use]
pub fn build_system_prompt(username: &str) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    format!("{PERSONA}\nYou are currently talking to {username}.\nCurrent datetime: {timestamp}")
}

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    #[must_use]
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            timeout: GENERATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    async fn send(&self, request: &GenerateRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(self.generate_url())
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(BotError::OllamaApi { status, message });
        }

        let body = response.text().await.map_err(classify_transport_error)?;
        parse_generate_response(&body)
    }
}

impl ResponseGenerator for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        username: &str,
        context: &[ContextLine],
        live_data: Option<&str>,
    ) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(prompt, username, context, live_data),
            stream: false,
            system: build_system_prompt(username),
        };

        debug!(
            "Sending generate request to {} (model {}, {} context lines)",
            self.base_url,
            self.model,
            context.len()
        );

        // Dropping the in-flight future on expiry closes the connection.
        if let Ok(result) = tokio::time::timeout(self.timeout, self.send(&request)).await {
            debug!("Received response from Ollama");
            result
        } else {
            warn!(
                "Generate request exceeded {}s deadline, aborted",
                self.timeout.as_secs()
            );
            Err(BotError::InferenceTimeout(self.timeout))
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> BotError {
    if err.is_connect() {
        BotError::InferenceUnavailable(err)
    } else {
        BotError::Reqwest(err)
    }
}

fn parse_generate_response(body: &str) -> Result<String> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| BotError::InferenceResponse(format!("Malformed response body: {e}")))?;

    let text = parsed
        .response
        .ok_or_else(|| BotError::InferenceResponse("Missing `response` field".to_string()))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(BotError::InferenceResponse("Empty response".to_string()));
    }
    Ok(text.to_string())
}
