//! The narrow slice of Discord the relay is allowed to touch.

use std::future::Future;

use poise::serenity_prelude::{
    ChannelId, Context, GetMessages, Message as SerenityMessage, MessageId, UserId,
};

use crate::error::Result;

/// The triggering message, reduced to what the relay reads.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
}

impl From<&SerenityMessage> for InboundMessage {
    fn from(message: &SerenityMessage) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            author_id: message.author.id,
            author_name: message.author.name.clone(),
            author_is_bot: message.author.bot,
            content: message.content.clone(),
        }
    }
}

/// A prior message from channel history.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub author_id: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
}

impl From<SerenityMessage> for HistoryMessage {
    fn from(message: SerenityMessage) -> Self {
        Self {
            author_id: message.author.id,
            author_name: message.author.name,
            author_is_bot: message.author.bot,
            content: message.content,
        }
    }
}

/// Capabilities the relay needs from the channel a message arrived in.
pub trait RelayChannel: Sync {
    /// The bot's own user ID.
    fn bot_user_id(&self) -> UserId;

    /// Up to `limit` messages strictly before `before`, newest first.
    fn recent_messages(
        &self,
        before: MessageId,
        limit: u8,
    ) -> impl Future<Output = Result<Vec<HistoryMessage>>> + Send;

    /// Show the typing indicator.
    fn broadcast_typing(&self) -> impl Future<Output = Result<()>> + Send;

    /// Reply to the triggering message.
    fn reply(&self, content: &str) -> impl Future<Output = Result<()>> + Send;
}

/// [`RelayChannel`] backed by a live serenity context.
pub struct SerenityChannel<'a> {
    ctx: &'a Context,
    message: &'a SerenityMessage,
}

impl<'a> SerenityChannel<'a> {
    #[must_use]
    pub fn new(ctx: &'a Context, message: &'a SerenityMessage) -> Self {
        Self { ctx, message }
    }
}

impl RelayChannel for SerenityChannel<'_> {
    fn bot_user_id(&self) -> UserId {
        self.ctx.cache.current_user().id
    }

    async fn recent_messages(&self, before: MessageId, limit: u8) -> Result<Vec<HistoryMessage>> {
        let messages = self
            .message
            .channel_id
            .messages(
                &self.ctx.http,
                GetMessages::new().before(before).limit(limit),
            )
            .await?;
        Ok(messages.into_iter().map(HistoryMessage::from).collect())
    }

    async fn broadcast_typing(&self) -> Result<()> {
        self.message.channel_id.broadcast_typing(&self.ctx.http).await?;
        Ok(())
    }

    async fn reply(&self, content: &str) -> Result<()> {
        self.message.reply(&self.ctx.http, content).await?;
        Ok(())
    }
}
