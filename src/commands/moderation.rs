//! Message moderation commands.

use std::fmt::Write;

use chrono::Utc;
use log::info;
use poise::CreateReply;
use poise::serenity_prelude::{GetMessages, MessageId};

use crate::error::{BotError, Result};

use super::Context;

/// Discord refuses to bulk delete messages older than two weeks.
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

fn is_bulk_deletable(created_at: i64, now: i64) -> bool {
    now - created_at < BULK_DELETE_MAX_AGE_SECS
}

fn clear_summary(deleted: usize, skipped: usize) -> String {
    let noun = if deleted == 1 { "message" } else { "messages" };
    let mut summary = format!("Deleted {deleted} {noun}.");
    if skipped > 0 {
        let _ = write!(
            summary,
            " Skipped {skipped} older than 14 days, which Discord won't bulk delete."
        );
    }
    summary
}

/// Delete recent messages in this channel.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_MESSAGES",
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "MANAGE_MESSAGES"
)]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "Number of messages to delete (1-100)"]
    #[min = 1]
    #[max = 100]
    amount: u8,
) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or(BotError::NotInServer)?;
    let channel_id = ctx.channel_id();

    ctx.defer_ephemeral().await?;

    let messages = channel_id
        .messages(ctx.http(), GetMessages::new().limit(amount))
        .await?;

    let now = Utc::now().timestamp();
    let deletable: Vec<MessageId> = messages
        .iter()
        .filter(|msg| is_bulk_deletable(msg.timestamp.unix_timestamp(), now))
        .map(|msg| msg.id)
        .collect();
    let skipped = messages.len() - deletable.len();

    match deletable.as_slice() {
        [] => {}
        [single] => channel_id.delete_message(ctx.http(), *single).await?,
        _ => channel_id.delete_messages(ctx.http(), &deletable).await?,
    }

    info!(
        "{} cleared {} messages in channel {} (guild {}), skipped {}",
        ctx.author().tag(),
        deletable.len(),
        channel_id,
        guild_id,
        skipped
    );

    ctx.send(
        CreateReply::default()
            .content(clear_summary(deletable.len(), skipped))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
