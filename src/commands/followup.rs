// followup.rs - Follow-up questions in summary threads
// A message in a tracked thread is answered with the whole stored conversation as
// context. The thread's turn lock is held for the round trip, so concurrent
// messages in one thread are answered in arrival order and always land in the store
// as user/assistant pairs.

use super::Services;
use crate::conversation::Turn;
use crate::discord::ThreadChannel;
use crate::error::{BotResult, CompletionError};
use log::{debug, info, warn};
use serenity::model::id::ChannelId;

pub const FOLLOW_UP_FAILED_NOTICE: &str = "Sorry, I couldn't answer that one. The conversation may have grown too long.";
pub const EMPTY_ANSWER_NOTICE: &str = "Sorry, I came up empty on that one. Try asking it another way.";

/// Answer `content` posted in `thread`. Returns `false` when the thread is not a
/// tracked summary thread, in which case nothing is sent or stored.
pub async fn handle_follow_up(
    services: &Services,
    threads: &dyn ThreadChannel,
    thread: ChannelId,
    user: &str,
    content: &str,
) -> BotResult<bool> {
    let _turn = match services.store.begin_turn(thread).await {
        Some(turn) => turn,
        None => return Ok(false),
    };
    let history = match services.store.get(thread).await {
        Some(history) => history,
        None => return Ok(false),
    };

    info!("[FOLLOWUP] Question from {} in thread {} ({} turns so far)", user, thread, history.len());
    set_locked(threads, thread, true).await;

    let question = Turn::user(content);
    let result = services.completions.complete(user, &history.with_pending(&question)).await;

    set_locked(threads, thread, false).await;

    let answer = match result {
        Ok(answer) => answer,
        Err(CompletionError::InvalidRequest(reason)) => {
            warn!("[FOLLOWUP] Completion rejected in thread {}: {}", thread, reason);
            threads.send(thread, FOLLOW_UP_FAILED_NOTICE).await?;
            return Ok(true);
        }
        Err(e) => return Err(e.into()),
    };

    // Blank answers are not stored: the next question should not see them as context.
    if answer.content.trim().is_empty() {
        warn!("[FOLLOWUP] Empty answer in thread {}", thread);
        threads.send(thread, EMPTY_ANSWER_NOTICE).await?;
        return Ok(true);
    }

    threads.send(thread, &answer.content).await?;
    services.store.append(thread, vec![question, answer]).await;
    debug!("[FOLLOWUP] Thread {} now holds {} turns", thread, history.len() + 2);
    Ok(true)
}

/// The Discord lock is only a signal to users; a permission failure is logged.
async fn set_locked(threads: &dyn ThreadChannel, thread: ChannelId, locked: bool) {
    if let Err(e) = threads.set_locked(thread, locked).await {
        warn!(
            "[FOLLOWUP] Could not {} thread {}: {}",
            if locked { "lock" } else { "unlock" },
            thread,
            e
        );
    }
}
