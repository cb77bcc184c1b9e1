use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::models::Symbol;

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let embed = help_embed();

    msg.channel_id
        .send_message(ctx, CreateMessage::default().embed(embed))
        .await
        .map_err(|e| format!("Failed to send help message: {}", e))?;

    Ok(())
}

fn tracked_coins() -> String {
    Symbol::ALL
        .iter()
        .map(|s| format!("• {} ({})", s.as_str(), s.display_name()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("📖 CoinPulse Commands Help")
        .description("Spot prices from Bybit, delivered to your DMs every 15 minutes.")
        .color(0x00b0f4)
        .field(
            "📬 Subscription",
            "`$start` - Subscribe to scheduled price updates\n`$stop` - Unsubscribe",
            false,
        )
        .field("💹 Prices", "`$price [BTC|ETH]` - Current prices", false)
        .field(
            "🎯 General",
            "`$ping` - Check bot latency\n`$health` - Dependency status\n`$help` - Show this help message",
            false,
        )
        .field("🪙 Tracked Coins", tracked_coins(), false)
        .field(
            "⚡ Rate Limiting",
            "5-second cooldown per command per user\nGlobal 50 requests/second limit",
            false,
        )
}

/// Sent once on `$start`
pub fn welcome_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("✅ CoinPulse Activated")
        .description("You will now receive price updates every 15 minutes.")
        .color(0x00ff00)
        .field(
            "Commands",
            "`$price` - Current prices\n`$stop` - Unsubscribe\n`$help` - Help",
            false,
        )
        .field("Tracked Coins", tracked_coins(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_coins_lists_every_symbol() {
        let coins = tracked_coins();
        assert_eq!(coins, "• BTC (Bitcoin)\n• ETH (Ethereum)");
    }
}
