use std::env;

use log::{debug, error, info};
use poise::serenity_prelude::ChannelId;

use crate::error::{BotError, Result};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub channel_id: ChannelId,
    pub ollama_url: String,
    pub ollama_model: String,
    pub weather_api_key: Option<String>,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if `DISCORD_TOKEN` or `CHANNEL_ID` is missing, or if
    /// `CHANNEL_ID` is not a valid channel ID.
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN").map_err(|e| {
            error!("Failed to load DISCORD_TOKEN from environment: {e}");
            e
        })?;

        let channel_id = env::var("CHANNEL_ID").map_err(|e| {
            error!("Failed to load CHANNEL_ID from environment: {e}");
            e
        })?;
        let channel_id = parse_channel_id(&channel_id)?;

        let ollama_url = env::var("OLLAMA_URL")
            .map_or_else(|_| DEFAULT_OLLAMA_URL.to_string(), |url| normalize_base_url(&url));
        let ollama_model =
            env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string());

        let weather_api_key = env::var("WEATHER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        info!("Configuration loaded successfully");
        debug!("Discord token length: {} characters", discord_token.len());
        debug!("Relay channel: {channel_id}");
        debug!("Ollama URL: {ollama_url}");
        debug!("Ollama model: {ollama_model}");
        debug!(
            "Weather lookups: {}",
            if weather_api_key.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );

        Ok(Self {
            discord_token,
            channel_id,
            ollama_url,
            ollama_model,
            weather_api_key,
        })
    }
}

fn parse_channel_id(raw: &str) -> Result<ChannelId> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
        .ok_or_else(|| BotError::Config(format!("CHANNEL_ID is not a valid channel ID: {raw:?}")))
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
