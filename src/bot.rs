//! Discord bot core logic and event handling.

use log::{debug, error, info, warn};
use poise::{
    CreateReply, Framework, FrameworkError, FrameworkOptions, builtins,
    serenity_prelude::{ClientBuilder, Context, FullEvent, GatewayIntents},
};

use crate::commands::all_commands;
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::ollama::OllamaClient;
use crate::relay::{InboundMessage, Relay, SerenityChannel};
use crate::weather::WeatherClient;

pub struct Data {
    relay: Relay<OllamaClient>,
    weather: Option<WeatherClient>,
}

impl Data {
    #[must_use]
    pub fn relay(&self) -> &Relay<OllamaClient> {
        &self.relay
    }

    #[must_use]
    pub fn weather(&self) -> Option<&WeatherClient> {
        self.weather.as_ref()
    }
}

/// Run the Discord bot.
///
/// # Errors
///
/// Returns an error if configuration is missing or the Discord client fails.
pub async fn run() -> Result<()> {
    info!("Initializing bot");
    let config = Config::from_env()?;

    debug!("Initializing Ollama client");
    let ollama = OllamaClient::new(config.ollama_url.clone(), config.ollama_model.clone());
    info!(
        "Relaying channel {} to model {} at {}",
        config.channel_id,
        ollama.model(),
        config.ollama_url
    );

    let weather = config.weather_api_key.clone().map(WeatherClient::new);
    let data = Data {
        relay: Relay::new(config.channel_id, ollama, weather.clone()),
        weather,
    };

    debug!("Setting up gateway intents");
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    debug!("Building framework");
    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: all_commands(),
            event_handler: |ctx, event, _framework, data| Box::pin(event_handler(ctx, event, data)),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready and connected to Discord");
                debug!("Registering commands globally");
                builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered successfully");
                Ok(data)
            })
        })
        .build();

    debug!("Creating Discord client");
    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting Discord client");

    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    Ok(())
}

async fn event_handler(ctx: &Context, event: &FullEvent, data: &Data) -> Result<()> {
    if let FullEvent::Message { new_message } = event {
        let channel = SerenityChannel::new(ctx, new_message);
        data.relay
            .handle_message(&channel, &InboundMessage::from(new_message))
            .await?;
    }
    Ok(())
}

async fn on_error(error: FrameworkError<'_, Data, BotError>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Command /{} failed for {}: {}",
                ctx.command().name,
                ctx.author().tag(),
                error
            );
            let reply = CreateReply::default()
                .content(error.user_message())
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                warn!("Failed to report command error: {e}");
            }
        }
        FrameworkError::EventHandler { error, event, .. } => {
            error!(
                "Event handler failed on {}: {}",
                event.snake_case_name(),
                error
            );
        }
        other => {
            if let Err(e) = builtins::on_error(other).await {
                error!("Error while handling framework error: {e}");
            }
        }
    }
}
