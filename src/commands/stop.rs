use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::info;

use super::app_state;

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let state = app_state(ctx).await?;

    let changed = state
        .prices
        .set_subscription(msg.author.id.get(), &msg.author.name, false)
        .await
        .map_err(|e| format!("Failed to deactivate subscription: {}", e))?;

    info!(user_id = msg.author.id.get(), changed, "User unsubscribed");

    let description = if changed {
        "You will no longer receive scheduled price updates. Use `$start` to subscribe again."
    } else {
        "You were not subscribed. Use `$start` to receive price updates."
    };

    let embed = CreateEmbed::default()
        .title("🔕 Unsubscribed")
        .description(description)
        .color(0x808080);

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
