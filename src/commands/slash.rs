// slash.rs - Slash Commands Module
// Registers /summarize with Discord and routes application command interactions.

use super::summarize::summarize;
use super::Services;
use crate::discord::InteractionResponder;
use crate::error::BotResult;
use log::info;
use serenity::{
    client::Context,
    http::Http,
    model::application::{
        command::{Command, CommandOptionType},
        interaction::{application_command::ApplicationCommandInteraction, InteractionResponseType},
    },
};

// ============================================================================
// SLASH COMMAND HANDLER
// ============================================================================

/// Handle slash command interactions
pub async fn handle_slash_command(
    ctx: &Context,
    services: &Services,
    interaction: &ApplicationCommandInteraction,
) -> BotResult<()> {
    match interaction.data.name.as_str() {
        "summarize" => handle_summarize_slash(ctx, services, interaction).await,
        other => {
            let response_text = format!("Unknown slash command: {}", other);
            respond_ephemeral(ctx, interaction, &response_text).await
        }
    }
}

/// Handle /summarize slash command
async fn handle_summarize_slash(
    ctx: &Context,
    services: &Services,
    interaction: &ApplicationCommandInteraction,
) -> BotResult<()> {
    let url = string_option(interaction, "url").unwrap_or_default();

    if url.is_empty() {
        return respond_ephemeral(ctx, interaction, "Please provide a video! Usage: `/summarize url:https://youtu.be/...`")
            .await;
    }

    let responder = InteractionResponder::new(ctx.http.clone(), interaction);
    let user = interaction.user.id.to_string();
    summarize(services, &responder, url.trim(), &user).await?;
    Ok(())
}

fn string_option(interaction: &ApplicationCommandInteraction, name: &str) -> Option<String> {
    interaction
        .data
        .options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

async fn respond_ephemeral(ctx: &Context, interaction: &ApplicationCommandInteraction, text: &str) -> BotResult<()> {
    interaction
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(text).ephemeral(true))
        })
        .await?;
    Ok(())
}

// ============================================================================
// SLASH COMMAND REGISTRATION
// ============================================================================

/// Replace the bot's global command set with /summarize
pub async fn register_slash_commands(http: &Http) -> BotResult<()> {
    let commands = Command::set_global_application_commands(http, |commands| {
        commands.create_application_command(|command| {
            command
                .name("summarize")
                .description("Summarize a Youtube video")
                .create_option(|option| {
                    option
                        .name("url")
                        .description("The URL or identifier of the Youtube video")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
    })
    .await?;

    info!("✅ Synced {} slash command(s) with Discord", commands.len());
    Ok(())
}
