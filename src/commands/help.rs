//! Embed-based `/help`.

use std::fmt::Write;
use std::time::Duration;

use poise::CreateReply;
use poise::serenity_prelude::{ChannelId, CreateEmbed, CreateEmbedFooter};

use crate::bot::Data;
use crate::error::{BotError, Result};
use crate::relay::MAX_MESSAGE_LEN;

use super::Context;

/// Discord blurple.
const EMBED_COLOUR: u32 = 0x0058_65F2;

const AUTOCOMPLETE_LIMIT: usize = 25;

/// What the help embed needs to know about one command.
#[derive(Debug, Clone)]
struct CommandEntry {
    name: String,
    description: String,
    parameters: Vec<ParameterEntry>,
}

#[derive(Debug, Clone)]
struct ParameterEntry {
    name: String,
    description: String,
    required: bool,
}

impl From<&poise::Command<Data, BotError>> for CommandEntry {
    fn from(command: &poise::Command<Data, BotError>) -> Self {
        Self {
            name: command.name.clone(),
            description: command
                .description
                .clone()
                .unwrap_or_else(|| "No description".to_string()),
            parameters: command
                .parameters
                .iter()
                .map(|param| ParameterEntry {
                    name: param.name.clone(),
                    description: param
                        .description
                        .clone()
                        .unwrap_or_else(|| "No description".to_string()),
                    required: param.required,
                })
                .collect(),
        }
    }
}

impl CommandEntry {
    fn usage(&self) -> String {
        let mut usage = format!("/{}", self.name);
        for param in &self.parameters {
            if param.required {
                let _ = write!(usage, " <{}>", param.name);
            } else {
                let _ = write!(usage, " [{}]", param.name);
            }
        }
        usage
    }
}

fn overview_embed(
    commands: &[CommandEntry],
    relay_channel: ChannelId,
    cooldown: Duration,
) -> CreateEmbed {
    let chat_help = format!(
        "Post a message in <#{relay_channel}> and I'll answer using the last few messages \
        as context.\n\
        • One question every {} seconds per person\n\
        • Messages starting with `/` are ignored\n\
        • Long answers are split into several messages of up to {MAX_MESSAGE_LEN} characters\n\
        • Ask about the weather in a city and I'll check live conditions",
        cooldown.as_secs()
    );

    commands
        .iter()
        .fold(
            CreateEmbed::new()
                .title("Help")
                .description("Here's everything I can do.")
                .colour(EMBED_COLOUR)
                .field("AI chat", chat_help, false),
            |embed, command| embed.field(command.usage(), &command.description, false),
        )
        .footer(CreateEmbedFooter::new(
            "Use /help <command> for details on a single command.",
        ))
}

fn command_embed(command: &CommandEntry) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title(command.usage())
        .description(&command.description)
        .colour(EMBED_COLOUR);

    if command.parameters.is_empty() {
        return embed.field("Options", "This command takes no options.", false);
    }

    command.parameters.iter().fold(embed, |embed, param| {
        let requirement = if param.required {
            "required"
        } else {
            "optional"
        };
        embed.field(
            format!("{} ({requirement})", param.name),
            &param.description,
            false,
        )
    })
}

fn find_command<'a>(commands: &'a [CommandEntry], name: &str) -> Result<&'a CommandEntry> {
    let name = name.trim().trim_start_matches('/');
    commands
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| BotError::UnknownCommand(name.to_string()))
}

fn registered_commands(ctx: Context<'_>) -> Vec<CommandEntry> {
    ctx.framework()
        .options()
        .commands
        .iter()
        .map(CommandEntry::from)
        .collect()
}

async fn autocomplete_command(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let partial = partial.trim().trim_start_matches('/').to_lowercase();
    registered_commands(ctx)
        .into_iter()
        .map(|command| command.name)
        .filter(|name| name.to_lowercase().starts_with(&partial))
        .take(AUTOCOMPLETE_LIMIT)
        .collect()
}

/// Show what I can do.
#[poise::command(slash_command)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Show details for a single command"]
    #[autocomplete = "autocomplete_command"]
    command: Option<String>,
) -> Result<()> {
    let commands = registered_commands(ctx);

    let embed = match command {
        Some(name) => command_embed(find_command(&commands, &name)?),
        None => {
            let relay = ctx.data().relay();
            overview_embed(&commands, relay.channel_id(), relay.cooldowns().window())
        }
    };

    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
