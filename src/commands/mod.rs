// commands/mod.rs - Command Module Registry
// Declares the handler modules and the services they share.

pub mod followup;       // Follow-up questions inside summary threads
pub mod slash;          // Slash command registration and dispatch
pub mod summarize;      // /summarize: captions -> summary -> thread

use crate::captions::CaptionFetcher;
use crate::completion::CompletionClient;
use crate::store::ConversationStore;
use crate::video::VideoMetadataProvider;
use std::sync::Arc;

/// Collaborators injected into both handlers. Built once in main.
pub struct Services {
    pub videos: Arc<dyn VideoMetadataProvider>,
    pub captions: Arc<dyn CaptionFetcher>,
    pub completions: Arc<dyn CompletionClient>,
    pub store: Arc<ConversationStore>,
    pub thread_auto_archive_minutes: u16,
}
