pub mod health;
pub mod help;
pub mod ping;
pub mod price;
pub mod start;
pub mod stop;

use std::sync::Arc;

use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::{debug, error, warn};

use crate::utils::{check_cooldown, check_global_rate_limit, extract_clean_error};
use crate::SharedState;

pub const PREFIX: char = '$';

/// Known command names and their aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Price,
    Help,
    Ping,
    Health,
}

impl Command {
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "$start" | "$subscribe" => Some(Command::Start),
            "$stop" | "$unsubscribe" => Some(Command::Stop),
            "$price" | "$prices" => Some(Command::Price),
            "$help" => Some(Command::Help),
            "$ping" => Some(Command::Ping),
            "$health" => Some(Command::Health),
            _ => None,
        }
    }

    /// Canonical name shared by a command and its aliases
    pub fn name(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Price => "price",
            Command::Help => "help",
            Command::Ping => "ping",
            Command::Health => "health",
        }
    }
}

/// Fetch the shared application state from the client data
pub async fn app_state(ctx: &Context) -> Result<Arc<SharedState>, String> {
    let data = ctx.data.read().await;
    data.get::<crate::AppState>()
        .cloned()
        .ok_or_else(|| "Bot is still starting up, please try again shortly.".to_string())
}

pub async fn handle_message(ctx: &Context, msg: &Message) {
    if msg.author.bot {
        return;
    }

    let parts: Vec<&str> = msg.content.split_whitespace().collect();
    let Some((&word, args)) = parts.split_first() else {
        return;
    };
    if !word.starts_with(PREFIX) {
        return;
    }

    if let Err(retry_after) = check_global_rate_limit().await {
        debug!(retry_after_ms = retry_after.as_millis() as u64, "Global rate limit hit, dropping command");
        return;
    }

    let Some(command) = Command::parse(word) else {
        debug!(command = word, user_id = msg.author.id.get(), "Unknown command");
        let _ = msg
            .channel_id
            .send_message(
                ctx,
                CreateMessage::default().embed(
                    CreateEmbed::default()
                        .title("Unknown command")
                        .description("Use `$help` to see the available commands.")
                        .color(0xffa500),
                ),
            )
            .await;
        return;
    };

    if let Err(hit) = check_cooldown(msg.author.id.get(), command.name()).await {
        if hit.should_warn {
            let _ = msg
                .channel_id
                .send_message(
                    ctx,
                    CreateMessage::default().embed(
                        CreateEmbed::default()
                            .title("Command Cooldown")
                            .description(format!(
                                "⏳ Please wait {} seconds before using this command again.",
                                hit.remaining.as_secs().max(1)
                            ))
                            .color(0xffa500),
                    ),
                )
                .await;
        }
        return;
    }

    let result = match command {
        Command::Start => start::execute(ctx, msg).await,
        Command::Stop => stop::execute(ctx, msg).await,
        Command::Price => price::execute(ctx, msg, args).await,
        Command::Help => help::execute(ctx, msg).await,
        Command::Ping => ping::execute(ctx, msg).await,
        Command::Health => health::execute(ctx, msg).await,
    };

    if let Err(e) = result {
        error!(command = command.name(), user_id = msg.author.id.get(), error = %e, "Error executing command");

        let embed = CreateEmbed::default()
            .title("Command Error")
            .description(user_error_message(&e))
            .color(0xff0000);

        if let Err(send_err) = msg
            .channel_id
            .send_message(ctx, CreateMessage::default().embed(embed))
            .await
        {
            warn!(error = %send_err, "Failed to report command error");
        }
    }
}

/// Turn an internal error string into something fit for chat
fn user_error_message(error_msg: &str) -> String {
    let clean_error = extract_clean_error(error_msg);

    if error_msg.contains("429") || error_msg.to_lowercase().contains("rate limit") {
        "⚠️ **Rate Limited**: Please try again in a moment.".to_string()
    } else if error_msg.contains("HTTP request") {
        "⚠️ **Network Error**: Having trouble connecting to Discord. Please try again.".to_string()
    } else if !clean_error.is_empty() {
        format!("❌ {}", clean_error)
    } else {
        "❌ An error occurred while executing the command.".to_string()
    }
}
