// discord.rs - Discord side effects used by the handlers
// The summarize and follow-up handlers only talk to these traits; the serenity
// implementations below do the actual HTTP calls.

use crate::error::BotResult;
use async_trait::async_trait;
use log::debug;
use serenity::http::Http;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::channel::ChannelType;
use serenity::model::id::{ChannelId, MessageId, UserId};
use std::sync::Arc;

pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const MAX_THREAD_NAME_LENGTH: usize = 100;

/// The response surface of one `/summarize` interaction.
#[async_trait]
pub trait SummaryResponder: Send + Sync {
    /// Deferred public acknowledgment; must precede any slow work.
    async fn acknowledge(&self) -> BotResult<()>;

    /// Replace the public acknowledgment with a notice only the requester sees.
    /// Discord cannot change a response's visibility, so the deferred response is
    /// deleted and the notice goes out as an ephemeral followup.
    async fn notify_privately(&self, notice: &str) -> BotResult<()>;

    /// Post the summary publicly and return the message a thread can hang off.
    async fn publish(&self, content: &str) -> BotResult<MessageId>;

    async fn open_thread(&self, message: MessageId, name: &str, auto_archive_minutes: u16) -> BotResult<ChannelId>;
}

/// Operations on a summary thread.
#[async_trait]
pub trait ThreadChannel: Send + Sync {
    async fn set_locked(&self, thread: ChannelId, locked: bool) -> BotResult<()>;

    async fn send(&self, thread: ChannelId, content: &str) -> BotResult<()>;
}

pub struct InteractionResponder<'a> {
    http: Arc<Http>,
    interaction: &'a ApplicationCommandInteraction,
}

impl<'a> InteractionResponder<'a> {
    pub fn new(http: Arc<Http>, interaction: &'a ApplicationCommandInteraction) -> Self {
        Self { http, interaction }
    }
}

#[async_trait]
impl<'a> SummaryResponder for InteractionResponder<'a> {
    async fn acknowledge(&self) -> BotResult<()> {
        self.interaction
            .create_interaction_response(&self.http, |response| {
                response.kind(InteractionResponseType::DeferredChannelMessageWithSource)
            })
            .await?;
        Ok(())
    }

    async fn notify_privately(&self, notice: &str) -> BotResult<()> {
        self.interaction.delete_original_interaction_response(&self.http).await?;
        self.interaction
            .create_followup_message(&self.http, |message| message.content(notice).ephemeral(true))
            .await?;
        Ok(())
    }

    async fn publish(&self, content: &str) -> BotResult<MessageId> {
        let mut chunks = split_message(content, MAX_MESSAGE_LENGTH).into_iter();
        let first = chunks.next().unwrap_or_default();

        let message = self
            .interaction
            .edit_original_interaction_response(&self.http, |response| response.content(first))
            .await?;

        for chunk in chunks {
            self.interaction
                .create_followup_message(&self.http, |followup| followup.content(chunk))
                .await?;
        }

        Ok(message.id)
    }

    async fn open_thread(&self, message: MessageId, name: &str, auto_archive_minutes: u16) -> BotResult<ChannelId> {
        let thread = self
            .interaction
            .channel_id
            .create_public_thread(&self.http, message, |thread| {
                thread.name(name).auto_archive_duration(auto_archive_minutes)
            })
            .await?;
        debug!("Opened thread {} ('{}') on message {}", thread.id, name, message);
        Ok(thread.id)
    }
}

pub struct DiscordThreads {
    http: Arc<Http>,
}

impl DiscordThreads {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ThreadChannel for DiscordThreads {
    async fn set_locked(&self, thread: ChannelId, locked: bool) -> BotResult<()> {
        thread.edit_thread(&self.http, |edit| edit.locked(locked)).await?;
        Ok(())
    }

    async fn send(&self, thread: ChannelId, content: &str) -> BotResult<()> {
        for chunk in split_message(content, MAX_MESSAGE_LENGTH) {
            thread.say(&self.http, chunk).await?;
        }
        Ok(())
    }
}

/// True for a thread channel created by `bot`.
pub fn is_bot_thread(kind: ChannelType, owner: Option<UserId>, bot: UserId) -> bool {
    matches!(
        kind,
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread
    ) && owner == Some(bot)
}

pub fn thread_name(title: &str) -> String {
    title.chars().take(MAX_THREAD_NAME_LENGTH).collect()
}

/// Split text into chunks of at most `max_len` bytes, preferring line breaks.
/// Lines longer than `max_len` are cut on character boundaries.
pub fn split_message(content: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        for piece in hard_wrap(line, max_len) {
            if !current.is_empty() && current.len() + piece.len() + 1 > max_len {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(piece);
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}

fn hard_wrap(line: &str, max_len: usize) -> Vec<&str> {
    if line.len() <= max_len {
        return vec![line];
    }

    let mut pieces = Vec::new();
    let mut rest = line;
    while rest.len() > max_len {
        let mut cut = max_len;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_message_functionality() {
        let lines = vec![
            "This is line 1 with some text that makes it moderately long to test splitting.",
            "This is line 2 with additional content that should also be quite lengthy.",
            "This is line 3 with even more text to ensure we exceed the character limit.",
            "This is line 4 which continues to add content for comprehensive testing.",
        ];
        let long_content = lines.join("\n");
        let max_len = 160;

        let chunks = split_message(&long_content, max_len);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|chunk| chunk.len() <= max_len));
        assert_eq!(chunks.join("\n"), long_content);

        let short_chunks = split_message("Short message", max_len);
        assert_eq!(short_chunks, vec!["Short message".to_string()]);
    }

    #[test]
    fn test_split_message_hard_wraps_long_lines() {
        let long_line = "é".repeat(1500); // 3000 bytes
        let chunks = split_message(&long_line, MAX_MESSAGE_LENGTH);

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|chunk| chunk.len() <= MAX_MESSAGE_LENGTH));
        assert_eq!(chunks.concat(), long_line);
    }

    #[test]
    fn test_split_message_keeps_blank_lines_inside_chunks() {
        let chunks = split_message("> ***Title***\n\nSummary", MAX_MESSAGE_LENGTH);
        assert_eq!(chunks, vec!["> ***Title***\n\nSummary".to_string()]);
        assert!(split_message("\n\n", MAX_MESSAGE_LENGTH).is_empty());
    }

    #[test]
    fn test_thread_name_is_truncated() {
        assert_eq!(thread_name("Short"), "Short");
        let long_title = "ü".repeat(150);
        assert_eq!(thread_name(&long_title).chars().count(), MAX_THREAD_NAME_LENGTH);
    }

    #[test]
    fn test_is_bot_thread() {
        let bot = UserId(1);
        assert!(is_bot_thread(ChannelType::PublicThread, Some(bot), bot));
        assert!(!is_bot_thread(ChannelType::PublicThread, Some(UserId(2)), bot));
        assert!(!is_bot_thread(ChannelType::PublicThread, None, bot));
        assert!(!is_bot_thread(ChannelType::Text, Some(bot), bot));
    }
}
