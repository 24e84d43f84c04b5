// completion.rs - Chat completion client
// One request per call: no retry, no streaming and no token pre-check. Callers must
// handle CompletionError::InvalidRequest, which is what an over-long or filtered
// conversation comes back as.

use crate::config::BotConfig;
use crate::conversation::{Role, Turn};
use crate::error::CompletionError;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the whole conversation and return the assistant's reply turn.
    /// `user` is an opaque caller identity forwarded for abuse tracking.
    async fn complete(&self, user: &str, conversation: &[Turn]) -> Result<Turn, CompletionError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    user: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// `content` is null when the reply was withheld, e.g. by the content filter.
#[derive(Deserialize)]
struct ReplyMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: &BotConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("yt-summary-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, user: &str, conversation: &[Turn]) -> Result<Turn, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: conversation,
            temperature: self.temperature,
            user,
        };

        debug!("[COMPLETION] Sending {} turns to {} ({})", conversation.len(), url, self.model);
        let start_time = Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(
            "[COMPLETION] HTTP {} after {:.2}s ({} bytes)",
            status,
            start_time.elapsed().as_secs_f32(),
            body.len()
        );

        if !status.is_success() {
            let message = api_error_message(&body);
            warn!("[COMPLETION] Request rejected with HTTP {}: {}", status, message);
            return Err(classify_failure(status.as_u16(), message));
        }

        parse_reply(&body)
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}

fn classify_failure(status: u16, message: String) -> CompletionError {
    match status {
        400 | 404 | 415 => CompletionError::InvalidRequest(message),
        _ => CompletionError::Api { status, message },
    }
}

fn parse_reply(body: &str) -> Result<Turn, CompletionError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::MalformedResponse("response has no choices".to_string()))?;

    match choice.message.content {
        Some(content) => Ok(Turn { role: choice.message.role, content }),
        None => Err(CompletionError::InvalidRequest(format!(
            "reply has no content (finish_reason: {})",
            choice.finish_reason.as_deref().unwrap_or("none")
        ))),
    }
}
