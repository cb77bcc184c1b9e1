use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::info;

use super::{app_state, help, price};

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let state = app_state(ctx).await?;

    let changed = state
        .prices
        .set_subscription(msg.author.id.get(), &msg.author.name, true)
        .await
        .map_err(|e| format!("Failed to activate subscription: {}", e))?;

    info!(user_id = msg.author.id.get(), username = %msg.author.name, changed, "User subscribed");

    let embed = if changed {
        help::welcome_embed()
    } else {
        CreateEmbed::default()
            .title("ℹ️ Already subscribed")
            .description("You are already receiving price updates. Use `$stop` to unsubscribe.")
            .color(0x00b0f4)
    };

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| e.to_string())?;

    price::send_prices(ctx, msg, &state, None).await
}
