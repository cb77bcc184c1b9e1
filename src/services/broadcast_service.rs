//! Fan-out of one message to many subscribers with a concurrency cap

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::models::Subscriber;
use crate::notify::Notifier;
use crate::utils::errors::ServiceError;
use crate::utils::shutdown::Shutdown;

pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Per-broadcast delivery counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

enum Outcome {
    Delivered,
    Failed,
    Skipped,
}

pub struct Broadcaster {
    notifier: Arc<dyn Notifier>,
    max_concurrent: usize,
}

impl Broadcaster {
    pub fn new(notifier: Arc<dyn Notifier>, max_concurrent: usize) -> Self {
        Self {
            notifier,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Deliver `payload` to every recipient, at most `max_concurrent` at a time.
    ///
    /// Individual failures (errors or panics) are logged and counted only.
    /// Recipients not yet started when shutdown fires are skipped and the call
    /// returns `ServiceError::Cancelled`.
    pub async fn broadcast(
        &self,
        recipients: &[Subscriber],
        payload: &str,
        shutdown: &Shutdown,
    ) -> Result<BroadcastReport, ServiceError> {
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let payload: Arc<str> = Arc::from(payload);
        let mut tasks = JoinSet::new();

        for recipient in recipients {
            let permits = permits.clone();
            let notifier = self.notifier.clone();
            let payload = payload.clone();
            let shutdown = shutdown.clone();
            let recipient_id = recipient.user_id;

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = shutdown.wait() => return Outcome::Skipped,
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return Outcome::Skipped,
                    },
                };

                if shutdown.is_triggered() {
                    return Outcome::Skipped;
                }

                match notifier.deliver(recipient_id, &payload).await {
                    Ok(()) => Outcome::Delivered,
                    Err(e) => {
                        warn!(recipient_id, error = %e, "Send prices failed");
                        Outcome::Failed
                    }
                }
            });
        }

        let mut report = BroadcastReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Outcome::Delivered) => report.delivered += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    error!(error = %e, "Delivery task panicked");
                    report.failed += 1;
                }
            }
        }

        info!(
            recipients = recipients.len(),
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            "Broadcast finished"
        );

        if shutdown.is_triggered() {
            return Err(ServiceError::Cancelled);
        }
        Ok(report)
    }
}
