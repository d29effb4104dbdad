use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Serenity error: {0}")]
    Serenity(Box<poise::serenity_prelude::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Inference server unreachable: {0}")]
    InferenceUnavailable(reqwest::Error),

    #[error("Inference request timed out after {}s", .0.as_secs())]
    InferenceTimeout(Duration),

    #[error("Ollama API error ({status}): {message}")]
    OllamaApi { status: StatusCode, message: String },

    #[error("Invalid inference response: {0}")]
    InferenceResponse(String),

    #[error("Weather API error ({status}): {message}")]
    WeatherApi { status: StatusCode, message: String },

    #[error("No weather data for location: {0}")]
    WeatherNotFound(String),

    #[error("Weather lookups are not configured")]
    WeatherNotConfigured,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command must be used in a server")]
    NotInServer,

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<poise::serenity_prelude::Error> for BotError {
    fn from(err: poise::serenity_prelude::Error) -> Self {
        BotError::Serenity(Box::new(err))
    }
}

impl BotError {
    /// Returns a user-friendly error message suitable for displaying in Discord
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            BotError::Serenity(_) => {
                "Sorry, I'm having trouble communicating with Discord right now. Please try again later.".to_string()
            }
            BotError::Config(_) | BotError::EnvVar(_) => {
                "Sorry, there's a configuration issue on my end. Please contact the bot administrator.".to_string()
            }
            BotError::InferenceUnavailable(_) => {
                "Sorry, the AI service is currently unavailable. Please contact the bot administrator.".to_string()
            }
            BotError::InferenceTimeout(_) => {
                "Sorry, that took too long to answer. Please try a simpler question.".to_string()
            }
            BotError::WeatherNotFound(location) => {
                format!("Sorry, I couldn't find any weather data for \"{location}\".")
            }
            BotError::WeatherNotConfigured => {
                "Weather lookups are not enabled on this bot.".to_string()
            }
            BotError::WeatherApi { status, .. } => match *status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    "Sorry, I'm having authentication issues with the weather service. Please contact the bot administrator.".to_string()
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    "Sorry, the weather service is rate limiting me. Please try again in a few moments.".to_string()
                }
                _ => "Sorry, the weather service is having issues right now. Please try again later.".to_string(),
            },
            BotError::UnknownCommand(name) => {
                format!("There is no command named `{name}`. Use `/help` to see them all.")
            }
            BotError::NotInServer => "This command can only be used in a server.".to_string(),
            BotError::OllamaApi { .. }
            | BotError::InferenceResponse(_)
            | BotError::Reqwest(_)
            | BotError::Url(_) => {
                "Sorry, I encountered an error while processing your request. Please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
