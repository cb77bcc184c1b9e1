use chrono::Utc;
use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use tracing::{debug, error};

use super::app_state;
use crate::models::{PriceSet, Symbol};
use crate::services::price_service::format_price_message;
use crate::SharedState;

pub async fn execute(ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), String> {
    let symbol = match args.first() {
        Some(raw) => Some(raw.parse::<Symbol>().map_err(|e| {
            format!("{}. Tracked coins: {}", e, tracked_symbols())
        })?),
        None => None,
    };

    let state = app_state(ctx).await?;
    send_prices(ctx, msg, &state, symbol).await
}

fn tracked_symbols() -> String {
    Symbol::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

/// Keep only `symbol` when one was requested
fn select(prices: PriceSet, symbol: Option<Symbol>) -> Result<PriceSet, String> {
    match symbol {
        None => Ok(prices),
        Some(symbol) => prices
            .get(symbol)
            .cloned()
            .map(|quote| PriceSet::from_quotes([quote]))
            .ok_or_else(|| format!("No price available for {} right now.", symbol)),
    }
}

/// Reply with the current prices, served from the cache when fresh
pub async fn send_prices(
    ctx: &Context,
    msg: &Message,
    state: &SharedState,
    symbol: Option<Symbol>,
) -> Result<(), String> {
    debug!(user_id = msg.author.id.get(), ?symbol, "Price command called");

    let prices = state.prices.current_prices().await.map_err(|e| {
        error!(error = %e, "Failed to get prices for command");
        "Failed to get prices. Please try again later.".to_string()
    })?;
    let prices = select(prices, symbol)?;

    let embed = CreateEmbed::default()
        .description(format_price_message(&prices, Utc::now()))
        .color(0xf7931a);

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
