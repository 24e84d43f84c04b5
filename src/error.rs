// error.rs - Error types shared by the summarize and follow-up handlers
// Each external collaborator fails with its own enum so the handlers can tell the
// recoverable cases (invalid completion request) apart from everything else.

use thiserror::Error;

/// Failures while loading botconfig.txt / the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set in botconfig.txt or the environment")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Failures of the video metadata provider (yt-dlp).
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("failed to launch yt-dlp: {0}")]
    Launch(#[from] std::io::Error),

    #[error("yt-dlp exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("could not parse yt-dlp metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures while downloading or decoding a caption payload.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("caption download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("caption payload is not valid json3: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures of the chat completion API.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The API declined the request (context too long, content filtered, ...).
    #[error("completion request rejected: {0}")]
    InvalidRequest(String),

    #[error("completion API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected completion response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Caption(#[from] CaptionError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("discord request failed: {0}")]
    Discord(#[from] serenity::Error),
}

pub type BotResult<T> = Result<T, BotError>;
