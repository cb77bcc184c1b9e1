use serenity::builder::CreateMessage;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::info;

use super::app_state;
use crate::services::health_service;

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let state = app_state(ctx).await?;

    let report = state.health.check().await;
    info!(status = report.status.as_str(), "Health check requested");

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(health_service::create_health_embed(&report)))
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
