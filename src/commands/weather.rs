//! `/weather` lookup command.

use log::info;

use crate::error::{BotError, Result};
use crate::weather::Units;

use super::Context;

/// Show the current weather for a location.
#[poise::command(slash_command)]
pub async fn weather(
    ctx: Context<'_>,
    #[description = "City or place name"] location: String,
    #[description = "Unit system (default: metric)"] units: Option<Units>,
) -> Result<()> {
    let client = ctx.data().weather().ok_or(BotError::WeatherNotConfigured)?;

    let location = location.trim();
    if location.is_empty() {
        return Err(BotError::WeatherNotFound(location.to_string()));
    }

    ctx.defer().await?;

    let report = client.current(location, units.unwrap_or_default()).await?;
    info!("{} looked up weather for {}", ctx.author().tag(), location);

    ctx.say(report.to_string()).await?;
    Ok(())
}
