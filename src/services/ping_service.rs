use std::time::{Duration, Instant};

use serenity::builder::CreateEmbed;
use serenity::prelude::*;

use crate::models::PingMetrics;
use crate::utils::format_duration;

pub async fn get_ping_metrics(ctx: &Context, start_time: Instant) -> Result<PingMetrics, String> {
    let response_latency = start_time.elapsed().as_millis() as u64;

    let data = ctx.data.read().await;

    let uptime = data
        .get::<crate::BotData>()
        .map(|started| format_duration(started.elapsed()))
        .unwrap_or_else(|| "Unknown".to_string());

    let cache_age = data
        .get::<crate::AppState>()
        .map(|state| describe_cache_age(state.prices.cache().age(), state.prices.cache().is_expired()))
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(PingMetrics {
        response_latency,
        uptime,
        cache_age,
    })
}

fn describe_cache_age(age: Duration, expired: bool) -> String {
    if expired {
        format!("{} (stale)", format_duration(age))
    } else {
        format_duration(age)
    }
}

pub fn create_ping_embed(metrics: &PingMetrics) -> CreateEmbed {
    CreateEmbed::default()
        .title("Pong! 🏓")
        .field("Response Latency", format!("{}ms", metrics.response_latency), true)
        .field("Price Cache Age", &metrics.cache_age, true)
        .field("Uptime", &metrics.uptime, false)
        .color(0x00b0f4)
}
