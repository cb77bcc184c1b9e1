//! Client-side sliding-window limiter for the market-data API
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Requests per second allowed by `ApiRateLimiter::default`
pub const DEFAULT_MAX_REQUESTS: usize = 20;

pub struct SlidingWindow {
    /// Timestamps of requests within the current window
    request_times: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindow {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            request_times: VecDeque::new(),
            max_requests,
            window,
        }
    }

    /// Record a request and return how long the caller must wait first (zero if none)
    fn check_and_record(&mut self) -> Duration {
        let now = Instant::now();

        // Drop timestamps that fell out of the window
        while let Some(&front) = self.request_times.front() {
            if now.duration_since(front) > self.window {
                self.request_times.pop_front();
            } else {
                break;
            }
        }

        if self.request_times.len() >= self.max_requests {
            if let Some(&oldest) = self.request_times.front() {
                let elapsed = now.duration_since(oldest);
                if elapsed < self.window {
                    return self.window - elapsed;
                }
            }
        }

        self.request_times.push_back(now);
        Duration::ZERO
    }
}

/// Shared limiter guarding one API host
pub struct ApiRateLimiter {
    inner: Mutex<SlidingWindow>,
}

impl ApiRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            inner: Mutex::new(SlidingWindow::new(max_requests, window)),
        }
    }

    /// Wait until a request slot is free and claim it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
                window.check_and_record()
            };

            if wait.is_zero() {
                return;
            }

            tracing::debug!("Quote API rate limit: waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }
}

impl Default for ApiRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, Duration::from_secs(1))
    }
}
