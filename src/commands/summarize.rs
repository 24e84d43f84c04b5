// summarize.rs - /summarize command
// Acknowledge, resolve captions, ask the model for a summary, post it publicly and
// open a thread for follow-up questions. The thread's conversation is seeded with the
// system, user and assistant turns of the summary exchange.

use super::Services;
use crate::captions::resolve_transcript;
use crate::conversation::{Conversation, Turn};
use crate::discord::{thread_name, SummaryResponder};
use crate::error::{BotResult, CompletionError};
use log::{info, warn};
use serenity::model::id::ChannelId;
use uuid::Uuid;

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that generates summaries of YouTube videos based on their captions.";
pub const NO_TRANSCRIPT_NOTICE: &str = "There is not enough information on this video.";
pub const SUMMARY_FAILED_NOTICE: &str = "Failed to create summary for video";

/// The two turns that open every summary conversation.
pub fn initial_conversation(title: &str, transcript: &str) -> Vec<Turn> {
    vec![
        Turn::system(SYSTEM_PROMPT),
        Turn::user(format!(
            "Summarize the following YouTube video: \"{}\". Here are the captions:\n\n{}",
            title, transcript
        )),
    ]
}

pub fn format_summary(title: &str, summary: &str) -> String {
    format!("> ***{}***\n\n{}", title, summary)
}

/// Run one summarize request. Returns the new thread id, or `None` when the
/// requester was sent a private failure notice instead.
pub async fn summarize(
    services: &Services,
    responder: &dyn SummaryResponder,
    reference: &str,
    user: &str,
) -> BotResult<Option<ChannelId>> {
    let request_id = Uuid::new_v4();
    info!("[SUMMARIZE][{}] '{}' requested by {}", request_id, reference, user);

    responder.acknowledge().await?;

    let video = services.videos.fetch(reference).await?;
    let transcript = resolve_transcript(&video, services.captions.as_ref())
        .await?
        .filter(|transcript| !transcript.trim().is_empty());

    let transcript = match transcript {
        Some(transcript) => transcript,
        None => {
            info!("[SUMMARIZE][{}] No transcript for '{}'", request_id, video.title);
            responder.notify_privately(NO_TRANSCRIPT_NOTICE).await?;
            return Ok(None);
        }
    };

    // TODO: count tokens and fail fast before calling the API
    let mut turns = initial_conversation(&video.title, &transcript);
    info!(
        "[SUMMARIZE][{}] Requesting summary of '{}' ({} caption lines)",
        request_id,
        video.title,
        transcript.lines().count()
    );

    let summary = match services.completions.complete(user, &turns).await {
        Ok(summary) => summary,
        Err(CompletionError::InvalidRequest(reason)) => {
            warn!("[SUMMARIZE][{}] Failed to create chat completion: {}", request_id, reason);
            responder.notify_privately(SUMMARY_FAILED_NOTICE).await?;
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let message = responder.publish(&format_summary(&video.title, &summary.content)).await?;
    let thread = responder
        .open_thread(message, &thread_name(&video.title), services.thread_auto_archive_minutes)
        .await?;

    turns.push(summary);
    services.store.create(thread, Conversation::new(turns)).await;

    info!("[SUMMARIZE][{}] Summary posted, follow-ups go to thread {}", request_id, thread);
    Ok(Some(thread))
}
