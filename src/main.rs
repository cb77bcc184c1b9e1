use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod cache;
mod commands;
mod config;
mod db;
mod models;
mod notify;
mod services;
mod utils;

use api::{BybitClient, CachedQuoteSource, QuoteSource};
use config::Config;
use db::MySqlStore;
use notify::{DiscordNotifier, Notifier};
use services::broadcast_service::Broadcaster;
use services::{HealthService, PriceService};
use utils::errors::ServiceError;
use utils::{Shutdown, WorkerPool};

const DEFAULT_LOG_FILTER: &str = "coinpulse=debug,serenity=warn";

struct Handler;

pub struct BotData;

impl TypeMapKey for BotData {
    type Value = Instant;
}

/// Services shared with command handlers
pub struct SharedState {
    pub prices: Arc<PriceService>,
    pub health: Arc<HealthService>,
    pub workers: WorkerPool,
}

pub struct AppState;

impl TypeMapKey for AppState {
    type Value = Arc<SharedState>;
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        match commands::app_state(&ctx).await {
            Ok(state) => {
                debug!(free_workers = state.workers.available(), "Queueing message");
                state.workers.submit(async move {
                    commands::handle_message(&ctx, &msg).await;
                });
            }
            Err(_) => commands::handle_message(&ctx, &msg).await,
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!(guilds = ready.guilds.len(), "{} is connected!", ready.user.name);
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("🤖 Starting CoinPulse bot v{}...", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    info!("Initializing database...");
    let pool = match db::init_db(&config.database_url).await {
        Ok(p) => {
            info!("Database initialized successfully");
            p
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    if std::env::args().any(|arg| arg == "--migrate") {
        info!("Migrations complete, exiting");
        return;
    }

    let store = Arc::new(MySqlStore::new(pool));

    let bybit: Arc<dyn QuoteSource> = match BybitClient::with_base_url(config.quote_api_url.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create quote client: {}", e);
            return;
        }
    };
    let cached = Arc::new(CachedQuoteSource::new(bybit.clone(), config.cache_ttl));

    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGES;

    let mut client = match Client::builder(&config.discord_token, intents)
        .event_handler(Handler)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return;
        }
    };

    let notifier: Arc<dyn Notifier> = Arc::new(DiscordNotifier::new(client.http.clone()));
    let prices = Arc::new(PriceService::new(
        cached,
        store.clone(),
        store.clone(),
        Broadcaster::new(notifier.clone(), config.broadcast_concurrency),
    ));
    let health = Arc::new(HealthService::new(store, bybit, notifier));

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            info!("Shutdown signal received");
            shutdown.trigger();
            shard_manager.shutdown_all().await;
        });
    }

    info!("Loading initial prices...");
    match prices.bootstrap(&shutdown).await {
        Ok(_) => {}
        Err(ServiceError::Fetch(e)) if e.is_cancelled() => {
            info!("Startup cancelled");
            return;
        }
        Err(e) => {
            error!("Failed to load initial prices: {}", e);
            return;
        }
    }

    {
        let mut data = client.data.write().await;
        data.insert::<BotData>(Instant::now());
        data.insert::<AppState>(Arc::new(SharedState {
            prices: prices.clone(),
            health,
            workers: WorkerPool::new("commands", config.command_workers),
        }));
    }

    let workers = [
        tokio::spawn(prices.clone().run_refresh_worker(config.refresh_interval, shutdown.clone())),
        tokio::spawn(prices.clone().run_notification_worker(config.notify_interval, shutdown.clone())),
    ];

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    shutdown.trigger();
    for worker in workers {
        if let Err(e) = worker.await {
            error!("Worker task failed: {}", e);
        }
    }

    info!("CoinPulse stopped");
}
