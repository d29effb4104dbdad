//! Slash commands.

mod help;
mod moderation;
mod weather;

use crate::bot::Data;
use crate::error::BotError;

/// Context type for slash commands.
type Context<'a> = poise::Context<'a, Data, BotError>;

/// Get every slash command the bot registers.
#[must_use]
pub fn all_commands() -> Vec<poise::Command<Data, BotError>> {
    vec![help::help(), moderation::clear(), weather::weather()]
}
