// testing.rs - In-memory doubles for handler tests
// Nothing here touches the network or Discord.

use crate::captions::{CaptionFetcher, CaptionPayload};
use crate::commands::Services;
use crate::completion::CompletionClient;
use crate::conversation::{Role, Turn};
use crate::discord::{SummaryResponder, ThreadChannel};
use crate::error::{BotError, BotResult, CaptionError, CompletionError, VideoError};
use crate::store::ConversationStore;
use crate::video::{CaptionFormat, CaptionTrack, VideoInfo, VideoMetadataProvider};
use async_trait::async_trait;
use serenity::model::id::{ChannelId, MessageId};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn manual_track(language: &str, exts: &[&str]) -> CaptionTrack {
    track(language, exts, "https://captions.test")
}

pub fn automatic_track(language: &str, exts: &[&str]) -> CaptionTrack {
    track(language, exts, "https://captions.test/auto")
}

fn track(language: &str, exts: &[&str], base: &str) -> CaptionTrack {
    CaptionTrack {
        language: language.to_string(),
        formats: exts
            .iter()
            .map(|ext| CaptionFormat {
                ext: ext.to_string(),
                url: format!("{}/{}.{}", base, language, ext),
                name: None,
            })
            .collect(),
    }
}

pub fn services(videos: StaticVideo, captions: StaticCaptions, completions: Arc<ScriptedCompletions>) -> Services {
    Services {
        videos: Arc::new(videos),
        captions: Arc::new(captions),
        completions,
        store: Arc::new(ConversationStore::new()),
        thread_auto_archive_minutes: 60,
    }
}

pub struct StaticVideo {
    info: Option<VideoInfo>,
}

impl StaticVideo {
    pub fn new(info: VideoInfo) -> Self {
        Self { info: Some(info) }
    }

    pub fn failing() -> Self {
        Self { info: None }
    }
}

#[async_trait]
impl VideoMetadataProvider for StaticVideo {
    async fn fetch(&self, _reference: &str) -> Result<VideoInfo, VideoError> {
        self.info.clone().ok_or_else(|| VideoError::Exit {
            status: "exit status: 1".to_string(),
            stderr: "ERROR: Unsupported URL".to_string(),
        })
    }
}

/// Serves the same json3 body for every URL and remembers what was asked for.
pub struct StaticCaptions {
    body: String,
    requested: Mutex<Vec<String>>,
}

impl StaticCaptions {
    pub fn new(body: &str) -> Self {
        Self { body: body.to_string(), requested: Mutex::new(Vec::new()) }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionFetcher for StaticCaptions {
    async fn fetch(&self, url: &str) -> Result<CaptionPayload, CaptionError> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(serde_json::from_str(&self.body)?)
    }
}

enum Script {
    Answer(String),
    Reject(String),
    Unavailable,
    Echo(Semaphore),
}

pub struct ScriptedCompletions {
    script: Script,
    calls: Mutex<Vec<(String, Vec<Turn>)>>,
}

impl ScriptedCompletions {
    fn with(script: Script) -> Self {
        Self { script, calls: Mutex::new(Vec::new()) }
    }

    pub fn answering(text: &str) -> Self {
        Self::with(Script::Answer(text.to_string()))
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::with(Script::Reject(reason.to_string()))
    }

    pub fn unavailable() -> Self {
        Self::with(Script::Unavailable)
    }

    /// Replies "answer to <last user turn>", one reply per permit given to `release`.
    pub fn echoing_on_release() -> Self {
        Self::with(Script::Echo(Semaphore::new(0)))
    }

    pub fn release(&self, replies: usize) {
        if let Script::Echo(gate) = &self.script {
            gate.add_permits(replies);
        }
    }

    /// (user identity, conversation) for every call, in call order.
    pub fn calls(&self) -> Vec<(String, Vec<Turn>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletions {
    async fn complete(&self, user: &str, conversation: &[Turn]) -> Result<Turn, CompletionError> {
        self.calls.lock().unwrap().push((user.to_string(), conversation.to_vec()));

        match &self.script {
            Script::Answer(text) => Ok(Turn::assistant(text.clone())),
            Script::Reject(reason) => Err(CompletionError::InvalidRequest(reason.clone())),
            Script::Unavailable => Err(CompletionError::Api { status: 503, message: "overloaded".to_string() }),
            Script::Echo(gate) => {
                gate.acquire().await.expect("gate is never closed").forget();
                let question = conversation
                    .iter()
                    .rev()
                    .find(|turn| turn.role == Role::User)
                    .map(|turn| turn.content.clone())
                    .unwrap_or_default();
                Ok(Turn::assistant(format!("answer to {}", question)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderEvent {
    Acknowledged,
    NotifiedPrivately(String),
    Published(String),
    ThreadOpened { name: String, auto_archive_minutes: u16 },
}

pub struct RecordingResponder {
    thread: ChannelId,
    events: Mutex<Vec<ResponderEvent>>,
}

impl RecordingResponder {
    /// `thread` is the id handed out when a thread gets opened.
    pub fn new(thread: ChannelId) -> Self {
        Self { thread, events: Mutex::new(Vec::new()) }
    }

    pub fn events(&self) -> Vec<ResponderEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: ResponderEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl SummaryResponder for RecordingResponder {
    async fn acknowledge(&self) -> BotResult<()> {
        self.record(ResponderEvent::Acknowledged);
        Ok(())
    }

    async fn notify_privately(&self, notice: &str) -> BotResult<()> {
        self.record(ResponderEvent::NotifiedPrivately(notice.to_string()));
        Ok(())
    }

    async fn publish(&self, content: &str) -> BotResult<MessageId> {
        self.record(ResponderEvent::Published(content.to_string()));
        Ok(MessageId(1))
    }

    async fn open_thread(&self, _message: MessageId, name: &str, auto_archive_minutes: u16) -> BotResult<ChannelId> {
        self.record(ResponderEvent::ThreadOpened { name: name.to_string(), auto_archive_minutes });
        Ok(self.thread)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadEvent {
    Locked(ChannelId),
    Unlocked(ChannelId),
    Sent(ChannelId, String),
}

pub struct RecordingThreads {
    deny_lock: bool,
    events: Mutex<Vec<ThreadEvent>>,
}

impl RecordingThreads {
    pub fn new() -> Self {
        Self { deny_lock: false, events: Mutex::new(Vec::new()) }
    }

    /// Lock and unlock fail the way a missing Manage Threads permission does.
    pub fn denying_lock() -> Self {
        Self { deny_lock: true, events: Mutex::new(Vec::new()) }
    }

    pub fn events(&self) -> Vec<ThreadEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThreadChannel for RecordingThreads {
    async fn set_locked(&self, thread: ChannelId, locked: bool) -> BotResult<()> {
        if self.deny_lock {
            return Err(BotError::Discord(serenity::Error::Other("Missing Permissions")));
        }
        let event = if locked { ThreadEvent::Locked(thread) } else { ThreadEvent::Unlocked(thread) };
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn send(&self, thread: ChannelId, content: &str) -> BotResult<()> {
        self.events.lock().unwrap().push(ThreadEvent::Sent(thread, content.to_string()));
        Ok(())
    }
}
