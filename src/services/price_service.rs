//! Price orchestration: bootstrap, periodic refresh and scheduled subscriber updates

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::CachedQuoteSource;
use crate::cache::PriceCache;
use crate::db::{PriceStore, SubscriberDirectory};
use crate::models::{PriceSet, Subscriber};
use crate::services::bootstrap_service::{fetch_with_retry, RetryPolicy};
use crate::services::broadcast_service::{BroadcastReport, Broadcaster};
use crate::utils::errors::ServiceError;
use crate::utils::shutdown::Shutdown;
use crate::utils::{Align, Table};

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);
pub const NOTIFY_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct PriceService {
    prices: Arc<CachedQuoteSource>,
    store: Arc<dyn PriceStore>,
    subscribers: Arc<dyn SubscriberDirectory>,
    broadcaster: Broadcaster,
    retry: RetryPolicy,
}

impl PriceService {
    pub fn new(
        prices: Arc<CachedQuoteSource>,
        store: Arc<dyn PriceStore>,
        subscribers: Arc<dyn SubscriberDirectory>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            prices,
            store,
            subscribers,
            broadcaster,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &PriceCache {
        self.prices.cache()
    }

    /// Fetch the first price set with retries, seed the cache and persist it.
    ///
    /// Fails only if no prices could be obtained; a failed save is logged.
    pub async fn bootstrap(&self, shutdown: &Shutdown) -> Result<PriceSet, ServiceError> {
        let prices = fetch_with_retry(self.prices.inner().as_ref(), &self.retry, shutdown).await?;

        self.cache().set(prices.clone());
        info!(symbols = prices.len(), "Initial prices loaded");

        if let Err(e) = self.save_prices(&prices).await {
            warn!(error = %e, "Failed to save initial prices");
        }

        Ok(prices)
    }

    /// Current prices through the cache
    pub async fn current_prices(&self) -> Result<PriceSet, ServiceError> {
        Ok(self.prices.get_all_prices().await?)
    }

    pub async fn refresh_once(&self) -> Result<PriceSet, ServiceError> {
        let prices = self.current_prices().await?;
        let missing = prices.missing();
        if !missing.is_empty() {
            warn!(?missing, "Refreshed prices are incomplete");
        }
        self.save_prices(&prices).await?;
        debug!(symbols = prices.len(), "Prices refreshed");
        Ok(prices)
    }

    /// Upsert every quote; failures are collected and reported together
    pub async fn save_prices(&self, prices: &PriceSet) -> Result<(), ServiceError> {
        let mut failures = Vec::new();

        for quote in prices.iter() {
            if let Err(e) = self.store.upsert(quote).await {
                error!(symbol = %quote.symbol, error = %e, "Failed to save price");
                failures.push(format!("{}: {}", quote.symbol, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Persist(failures))
        }
    }

    /// Activate or deactivate a subscriber, creating the record on first use.
    ///
    /// Returns `false` if the subscriber was already in the requested state.
    pub async fn set_subscription(
        &self,
        user_id: u64,
        username: &str,
        active: bool,
    ) -> Result<bool, ServiceError> {
        let previous = self.subscribers.get(user_id).await?;
        let changed = previous.as_ref().map_or(true, |s| s.active != active);

        let subscriber = Subscriber::new(user_id, username, active);
        self.subscribers.save(&subscriber).await?;

        info!(user_id, active, changed, "Subscription updated");
        Ok(changed)
    }

    /// Send the current prices to every active subscriber
    pub async fn notify_subscribers(&self, shutdown: &Shutdown) -> Result<BroadcastReport, ServiceError> {
        let recipients = self.subscribers.list_active().await?;
        if recipients.is_empty() {
            debug!("No active subscribers, skipping notification");
            return Ok(BroadcastReport::default());
        }

        let prices = self.current_prices().await?;
        if prices.is_empty() {
            warn!("No prices available, skipping notification");
            return Ok(BroadcastReport::default());
        }

        let message = format_price_message(&prices, Utc::now());
        self.broadcaster.broadcast(&recipients, &message, shutdown).await
    }

    pub async fn run_refresh_worker(self: Arc<Self>, period: Duration, shutdown: Shutdown) {
        info!(period_secs = period.as_secs(), "Refresh worker started");
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    // Dropping the refresh on shutdown releases the cache gate
                    tokio::select! {
                        _ = shutdown.wait() => break,
                        result = self.refresh_once() => {
                            if let Err(e) = result {
                                error!(error = %e, "Price refresh failed");
                            }
                        }
                    }
                }
            }
        }

        info!("Refresh worker stopped");
    }

    pub async fn run_notification_worker(self: Arc<Self>, period: Duration, shutdown: Shutdown) {
        info!(period_secs = period.as_secs(), "Notification worker started");
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    let result = tokio::select! {
                        _ = shutdown.wait() => break,
                        result = self.notify_subscribers(&shutdown) => result,
                    };
                    match result {
                        Ok(report) => debug!(attempted = report.attempted(), delivered = report.delivered, failed = report.failed, "Notification round done"),
                        Err(ServiceError::Cancelled) => break,
                        Err(e) => error!(error = %e, "Notification round failed"),
                    }
                }
            }
        }

        info!("Notification worker stopped");
    }
}

/// Render the price update sent to subscribers; symbols without a quote are left out
pub fn format_price_message(prices: &PriceSet, now: DateTime<Utc>) -> String {
    let mut table = Table::new(&["Coin", "Price (USDT)", "Observed"]).align(1, Align::Right);
    for quote in prices.iter() {
        table.add_row(&[
            quote.symbol.as_str().to_string(),
            quote.price.clone(),
            quote.observed_at.format("%H:%M:%S").to_string(),
        ]);
    }

    format!(
        "**Current Crypto Prices**\n{}\nLast update: {} UTC",
        table.render(),
        now.format("%Y-%m-%d %H:%M:%S")
    )
}
