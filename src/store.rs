// store.rs - Conversation Store
// Process-lifetime map from summary thread id to the conversation held in it.
// Each thread also has a turn lock: a follow-up holds it from reading the history
// until its question and answer are appended, so two messages in one thread are
// answered one after the other.

use crate::conversation::{Conversation, Turn};
use log::debug;
use serenity::model::id::ChannelId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Held for the duration of one follow-up round trip in a thread.
pub type TurnGuard = OwnedMutexGuard<()>;

struct ThreadEntry {
    turn: Arc<Mutex<()>>,
    conversation: Mutex<Conversation>,
}

#[derive(Default)]
pub struct ConversationStore {
    threads: RwLock<HashMap<ChannelId, Arc<ThreadEntry>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the conversation for `thread_id`.
    pub async fn get(&self, thread_id: ChannelId) -> Option<Conversation> {
        let entry = self.entry(thread_id).await?;
        let conversation = entry.conversation.lock().await;
        Some(conversation.clone())
    }

    pub async fn contains(&self, thread_id: ChannelId) -> bool {
        self.threads.read().await.contains_key(&thread_id)
    }

    /// Register a new summary thread. An existing entry for the id is replaced.
    pub async fn create(&self, thread_id: ChannelId, conversation: Conversation) {
        debug!("[STORE] Tracking thread {} with {} turns", thread_id, conversation.len());
        let entry = ThreadEntry {
            turn: Arc::new(Mutex::new(())),
            conversation: Mutex::new(conversation),
        };
        self.threads.write().await.insert(thread_id, Arc::new(entry));
    }

    /// Append turns to a tracked thread. Returns false if the thread is unknown.
    pub async fn append(&self, thread_id: ChannelId, turns: Vec<Turn>) -> bool {
        match self.entry(thread_id).await {
            Some(entry) => {
                entry.conversation.lock().await.extend(turns);
                true
            }
            None => false,
        }
    }

    /// Wait for the thread's turn lock. `None` if the thread is not tracked.
    pub async fn begin_turn(&self, thread_id: ChannelId) -> Option<TurnGuard> {
        let entry = self.entry(thread_id).await?;
        Some(entry.turn.clone().lock_owned().await)
    }

    pub async fn len(&self) -> usize {
        self.threads.read().await.len()
    }

    async fn entry(&self, thread_id: ChannelId) -> Option<Arc<ThreadEntry>> {
        self.threads.read().await.get(&thread_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Conversation {
        Conversation::new(vec![Turn::system("s"), Turn::user("u"), Turn::assistant("a")])
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = ConversationStore::new();
        assert!(store.get(ChannelId(1)).await.is_none());

        store.create(ChannelId(1), seed()).await;
        assert!(store.contains(ChannelId(1)).await);
        assert_eq!(store.get(ChannelId(1)).await.unwrap().len(), 3);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_unknown_thread_is_noop() {
        let store = ConversationStore::new();
        assert!(!store.append(ChannelId(9), vec![Turn::user("hello")]).await);
        assert!(store.begin_turn(ChannelId(9)).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_append_preserves_prior_turns() {
        let store = ConversationStore::new();
        store.create(ChannelId(1), seed()).await;

        assert!(store.append(ChannelId(1), vec![Turn::user("q"), Turn::assistant("r")]).await);

        let conversation = store.get(ChannelId(1)).await.unwrap();
        assert_eq!(conversation.turns()[..3], seed().turns()[..]);
        assert_eq!(conversation.turns()[3..], [Turn::user("q"), Turn::assistant("r")]);
    }

    #[tokio::test]
    async fn test_turn_lock_is_per_thread() {
        let store = Arc::new(ConversationStore::new());
        store.create(ChannelId(1), seed()).await;
        store.create(ChannelId(2), seed()).await;

        let guard = store.begin_turn(ChannelId(1)).await.unwrap();

        // Another thread is unaffected, and reads/appends never wait on a turn.
        let other = store.begin_turn(ChannelId(2)).await;
        assert!(other.is_some());
        assert!(store.append(ChannelId(1), vec![Turn::user("during")]).await);

        // A second turn in the same thread waits until the guard is dropped.
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.begin_turn(ChannelId(1)).await.is_some() })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished());

        drop(guard);
        assert!(waiter.await.unwrap());
        assert_eq!(store.get(ChannelId(1)).await.unwrap().len(), 4);
    }
}
