//! Startup fetch with exponential backoff
//!
//! The service refuses to start with an empty cache, so the first price set is
//! fetched through `fetch_with_retry` before any worker is spawned.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::api::QuoteSource;
use crate::models::PriceSet;
use crate::utils::errors::FetchError;
use crate::utils::shutdown::Shutdown;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound for a single attempt; a timed-out attempt counts as failed
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10 * 60),
            attempt_timeout: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `delay` has been used once
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is reached.
///
/// Shutdown aborts both running attempts and backoff waits with
/// `FetchError::Cancelled`; it is never reported as exhaustion.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    shutdown: &Shutdown,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay.min(policy.max_delay);
    let mut attempt = 0;

    loop {
        attempt += 1;
        if shutdown.is_triggered() {
            return Err(FetchError::Cancelled);
        }

        let outcome = tokio::select! {
            _ = shutdown.wait() => return Err(FetchError::Cancelled),
            res = tokio::time::timeout(policy.attempt_timeout, op()) => {
                res.unwrap_or(Err(FetchError::Timeout(policy.attempt_timeout)))
            }
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
            Err(e) => e,
        };

        warn!(attempt, max_attempts, error = %err, "Attempt failed");

        if attempt >= max_attempts {
            return Err(FetchError::RetriesExhausted {
                attempts: max_attempts,
                source: Box::new(err),
            });
        }

        tokio::select! {
            _ = shutdown.wait() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        delay = policy.next_delay(delay);
    }
}

/// Fetch the initial price set, retrying transient source failures
pub async fn fetch_with_retry(
    source: &dyn QuoteSource,
    policy: &RetryPolicy,
    shutdown: &Shutdown,
) -> Result<PriceSet, FetchError> {
    let prices = retry_with_backoff(policy, shutdown, || source.fetch_all()).await?;
    info!(symbols = prices.len(), "Initial prices fetched");
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{prices, ScriptedSource};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fails_then_succeeds() {
        let source = ScriptedSource::new(vec![Err(())], Ok(prices("50000.00", "3000")));
        let shutdown = Shutdown::new();

        let result = fetch_with_retry(&source, &RetryPolicy::default(), &shutdown)
            .await
            .expect("second attempt succeeds");

        assert_eq!(source.calls(), 2);
        assert_eq!(
            result.get(crate::models::Symbol::Btc).map(|q| q.price.as_str()),
            Some("50000.00")
        );

        let times = source.call_times();
        assert!(times[1] - times[0] >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_double_up_to_cap() {
        let source = ScriptedSource::new(vec![Err(()); 4], Ok(prices("1", "1")));
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            attempt_timeout: Duration::from_secs(15),
        };

        fetch_with_retry(&source, &policy, &Shutdown::new())
            .await
            .expect("fifth attempt succeeds");

        let times = source.call_times();
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        let expected = [100, 200, 300, 300].map(Duration::from_millis);
        assert_eq!(gaps.len(), expected.len());
        for (gap, want) in gaps.iter().zip(expected) {
            assert!(*gap >= want && *gap < want + Duration::from_millis(5), "gap {:?} want {:?}", gap, want);
        }
    }

    #[test]
    fn test_next_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;

        for _ in 0..20 {
            let next = policy.next_delay(delay);
            assert!(next >= delay);
            assert!(next <= delay * 2);
            assert!(next <= Duration::from_secs(600));
            delay = next;
        }
        assert_eq!(delay, policy.max_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_exhausts_after_five_attempts() {
        let source = ScriptedSource::always(Err(()));

        let err = fetch_with_retry(&source, &RetryPolicy::default(), &Shutdown::new())
            .await
            .expect_err("never succeeds");

        assert_eq!(source.calls(), 5);
        match err {
            FetchError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 5);
                assert!(matches!(*source, FetchError::Source(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_has_no_delay() {
        let source = ScriptedSource::always(Ok(prices("1", "1")));
        let start = tokio::time::Instant::now();

        fetch_with_retry(&source, &RetryPolicy::default(), &Shutdown::new())
            .await
            .expect("first attempt succeeds");

        assert_eq!(source.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_backoff_is_cancelled() {
        let source = Arc::new(ScriptedSource::always(Err(())));
        let shutdown = Shutdown::new();
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(60),
            ..RetryPolicy::default()
        };

        let task = {
            let source = source.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { fetch_with_retry(source.as_ref(), &policy, &shutdown).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.trigger();

        let err = task.await.expect("join").expect_err("cancelled");
        assert!(err.is_cancelled());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_attempt_is_cancelled() {
        let source = Arc::new(
            ScriptedSource::always(Ok(prices("1", "1"))).with_delay(Duration::from_secs(10)),
        );
        let shutdown = Shutdown::new();

        let task = {
            let source = source.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                fetch_with_retry(source.as_ref(), &RetryPolicy::default(), &shutdown).await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.trigger();

        let err = tokio::time::timeout(Duration::from_millis(10), task)
            .await
            .expect("returns without waiting for the attempt")
            .expect("join")
            .expect_err("cancelled");
        assert!(matches!(err, FetchError::Cancelled));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_times_out() {
        let source = ScriptedSource::new(vec![Ok(prices("1", "1"))], Ok(prices("2", "2")))
            .with_delay(Duration::from_secs(20));
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };

        let err = fetch_with_retry(&source, &policy, &Shutdown::new())
            .await
            .expect_err("both attempts hang past the timeout");

        match err {
            FetchError::RetriesExhausted { source, .. } => {
                assert!(matches!(*source, FetchError::Timeout(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
