use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};
use tracing::warn;

use crate::api::QuoteSource;
use crate::db::SubscriberDirectory;
use crate::models::{HealthCheck, HealthReport, HealthStatus, Symbol};
use crate::notify::Notifier;

pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub const CHECK_DATABASE: &str = "database";
pub const CHECK_QUOTE_API: &str = "quote_api";
pub const CHECK_DISCORD: &str = "discord";

/// Probes every external dependency
pub struct HealthService {
    subscribers: Arc<dyn SubscriberDirectory>,
    quotes: Arc<dyn QuoteSource>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl HealthService {
    /// `quotes` should be the uncached source so the check reaches the exchange
    pub fn new(
        subscribers: Arc<dyn SubscriberDirectory>,
        quotes: Arc<dyn QuoteSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            subscribers,
            quotes,
            notifier,
            timeout: CHECK_TIMEOUT,
        }
    }

    pub async fn check(&self) -> HealthReport {
        let (database, quote_api, discord) = tokio::join!(
            run_check(CHECK_DATABASE, self.timeout, async {
                self.subscribers
                    .count()
                    .await
                    .map(|n| format!("{} subscribers", n))
                    .map_err(|e| e.to_string())
            }),
            run_check(CHECK_QUOTE_API, self.timeout, async {
                self.quotes
                    .fetch_one(Symbol::Btc)
                    .await
                    .map(|q| format!("BTC at {}", q.price))
                    .map_err(|e| e.to_string())
            }),
            run_check(CHECK_DISCORD, self.timeout, async {
                self.notifier
                    .check()
                    .await
                    .map(|()| "gateway reachable".to_string())
                    .map_err(|e| e.to_string())
            }),
        );

        let status = overall_status(database.is_ok(), quote_api.is_ok(), discord.is_ok());

        let mut checks = BTreeMap::new();
        checks.insert(CHECK_DATABASE.to_string(), database);
        checks.insert(CHECK_QUOTE_API.to_string(), quote_api);
        checks.insert(CHECK_DISCORD.to_string(), discord);

        HealthReport {
            status,
            timestamp: Utc::now(),
            checks,
        }
    }
}

async fn run_check<F>(name: &str, timeout: Duration, probe: F) -> HealthCheck
where
    F: Future<Output = Result<String, String>>,
{
    let result = match tokio::time::timeout(timeout, probe).await {
        Ok(result) => result,
        Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
    };

    match result {
        Ok(message) => HealthCheck::ok(message),
        Err(message) => {
            warn!(check = name, error = %message, "Health check failed");
            HealthCheck::error(message)
        }
    }
}

/// Storage and prices are essential; chat transport loss only degrades service
fn overall_status(database_ok: bool, quote_api_ok: bool, discord_ok: bool) -> HealthStatus {
    if !database_ok || !quote_api_ok {
        HealthStatus::Error
    } else if !discord_ok {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    }
}

pub fn create_health_embed(report: &HealthReport) -> CreateEmbed {
    let color = match report.status {
        HealthStatus::Ok => 0x00ff00,
        HealthStatus::Degraded => 0xffa500,
        HealthStatus::Error => 0xff0000,
    };

    let mut embed = CreateEmbed::default()
        .title(format!("Health: {}", report.status.as_str()))
        .color(color)
        .footer(CreateEmbedFooter::new(format!(
            "Checked at {} UTC",
            report.timestamp.format("%Y-%m-%d %H:%M:%S")
        )));

    for (name, check) in &report.checks {
        let icon = if check.is_ok() { "✅" } else { "❌" };
        embed = embed.field(name, format!("{} {}", icon, check.message), false);
    }
    embed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{prices, ScriptedSource};
    use crate::db::testing::MemoryStore;
    use crate::models::Subscriber;
    use crate::notify::testing::RecordingNotifier;

    fn service(source: ScriptedSource, store: MemoryStore, notifier: RecordingNotifier) -> HealthService {
        HealthService::new(Arc::new(store), Arc::new(source), Arc::new(notifier))
    }

    #[tokio::test]
    async fn test_all_healthy() {
        let health = service(
            ScriptedSource::always(Ok(prices("64000", "3100"))),
            MemoryStore::with_subscribers(vec![Subscriber::new(1, "alice", true)]),
            RecordingNotifier::default(),
        );

        let report = health.check().await;

        assert_eq!(report.status, HealthStatus::Ok);
        assert_eq!(report.checks.len(), 3);
        assert_eq!(report.checks[CHECK_DATABASE].message, "1 subscribers");
        assert_eq!(report.checks[CHECK_QUOTE_API].message, "BTC at 64000");
    }

    #[tokio::test]
    async fn test_discord_failure_degrades() {
        let health = service(
            ScriptedSource::always(Ok(prices("64000", "3100"))),
            MemoryStore::default(),
            RecordingNotifier {
                unhealthy: true,
                ..Default::default()
            },
        );

        let report = health.check().await;

        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(!report.checks[CHECK_DISCORD].is_ok());
    }

    #[tokio::test]
    async fn test_database_failure_is_error() {
        let health = service(
            ScriptedSource::always(Ok(prices("64000", "3100"))),
            MemoryStore {
                fail_writes: true,
                ..Default::default()
            },
            RecordingNotifier::default(),
        );

        assert_eq!(health.check().await.status, HealthStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_quote_api_times_out() {
        let health = service(
            ScriptedSource::always(Ok(prices("64000", "3100"))).with_delay(Duration::from_secs(30)),
            MemoryStore::default(),
            RecordingNotifier::default(),
        );

        let report = health.check().await;

        assert_eq!(report.status, HealthStatus::Error);
        assert_eq!(report.checks[CHECK_QUOTE_API].message, "timed out after 5s");
    }

    #[test]
    fn test_overall_status_rules() {
        assert_eq!(overall_status(true, true, true), HealthStatus::Ok);
        assert_eq!(overall_status(true, true, false), HealthStatus::Degraded);
        assert_eq!(overall_status(false, true, true), HealthStatus::Error);
        assert_eq!(overall_status(true, false, false), HealthStatus::Error);
    }
}
