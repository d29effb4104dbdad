//! Conversation context from recent channel history.

use log::{debug, warn};
use poise::serenity_prelude::{MessageId, UserId};

use crate::types::{ContextLine, Speaker};

use super::channel::{HistoryMessage, RelayChannel};

/// How many prior messages are offered to the model.
pub const CONTEXT_LIMIT: u8 = 10;

/// Fetches up to `limit` messages before `trigger` and formats them oldest first.
///
/// Other bots are dropped; the bot's own messages are kept and tagged as the
/// assistant. A failed fetch yields empty context rather than an error.
pub async fn fetch_context<C: RelayChannel>(
    channel: &C,
    trigger: MessageId,
    limit: u8,
) -> Vec<ContextLine> {
    let bot_user_id = channel.bot_user_id();

    match channel.recent_messages(trigger, limit).await {
        Ok(messages) => {
            let lines = to_context_lines(messages, bot_user_id);
            debug!("Built {} context lines", lines.len());
            lines
        }
        Err(e) => {
            warn!("Failed to fetch channel history, continuing without context: {e}");
            Vec::new()
        }
    }
}

fn to_context_lines(messages: Vec<HistoryMessage>, bot_user_id: UserId) -> Vec<ContextLine> {
    // Discord returns newest first
    messages
        .into_iter()
        .rev()
        .filter(|msg| !msg.author_is_bot || msg.author_id == bot_user_id)
        .map(|msg| {
            let speaker = if msg.author_id == bot_user_id {
                Speaker::Assistant
            } else {
                Speaker::User(msg.author_name)
            };
            ContextLine::new(speaker, msg.content)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::{BotError, Result};

    const BOT_ID: u64 = 999;
    const OTHER_BOT_ID: u64 = 777;

    struct HistoryChannel {
        /// Oldest first, like a real channel.
        history: Vec<HistoryMessage>,
        fail: bool,
        requests: Mutex<Vec<(MessageId, u8)>>,
    }

    impl HistoryChannel {
        fn new(history: Vec<HistoryMessage>) -> Self {
            Self {
                history,
                fail: false,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl RelayChannel for HistoryChannel {
        fn bot_user_id(&self) -> UserId {
            UserId::new(BOT_ID)
        }

        async fn recent_messages(
            &self,
            before: MessageId,
            limit: u8,
        ) -> Result<Vec<HistoryMessage>> {
            self.requests
                .lock()
                .expect("lock")
                .push((before, limit));
            if self.fail {
                return Err(BotError::Config("history unavailable".to_string()));
            }
            Ok(self
                .history
                .iter()
                .rev()
                .take(usize::from(limit))
                .cloned()
                .collect())
        }

        async fn broadcast_typing(&self) -> Result<()> {
            Ok(())
        }

        async fn reply(&self, _content: &str) -> Result<()> {
            Ok(())
        }
    }

    fn msg(author_id: u64, name: &str, bot: bool, content: &str) -> HistoryMessage {
        HistoryMessage {
            author_id: UserId::new(author_id),
            author_name: name.to_string(),
            author_is_bot: bot,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn returns_at_most_limit_lines_in_chronological_order() {
        let history: Vec<_> = (1..=15)
            .map(|i| msg(1, "alice", false, &format!("message {i}")))
            .collect();
        let channel = HistoryChannel::new(history);

        let lines = fetch_context(&channel, MessageId::new(100), CONTEXT_LIMIT).await;

        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0].to_string(), "alice: message 6");
        assert_eq!(lines[9].to_string(), "alice: message 15");
        assert_eq!(
            channel.requests.lock().expect("lock").as_slice(),
            &[(MessageId::new(100), CONTEXT_LIMIT)]
        );
    }

    #[tokio::test]
    async fn keeps_own_messages_and_drops_other_bots() {
        let channel = HistoryChannel::new(vec![
            msg(1, "alice", false, "hi"),
            msg(BOT_ID, "ollamacord", true, "hello"),
            msg(OTHER_BOT_ID, "musicbot", true, "now playing"),
            msg(2, "bob", false, "yo"),
        ]);

        let lines: Vec<String> = fetch_context(&channel, MessageId::new(100), CONTEXT_LIMIT)
            .await
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(lines, ["alice: hi", "Assistant: hello", "bob: yo"]);
    }

    #[tokio::test]
    async fn fetch_failure_yields_empty_context() {
        let mut channel = HistoryChannel::new(vec![msg(1, "alice", false, "hi")]);
        channel.fail = true;

        assert!(
            fetch_context(&channel, MessageId::new(100), CONTEXT_LIMIT)
                .await
                .is_empty()
        );
    }
}
