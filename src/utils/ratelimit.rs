use std::collections::HashMap;
use std::time::Duration;

use lazy_static::lazy_static;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const COOLDOWN: Duration = Duration::from_secs(5);
const GLOBAL_RATE_LIMIT: usize = 50; // commands per window
const RATE_WINDOW: Duration = Duration::from_secs(1);

lazy_static! {
    static ref COMMAND_COOLDOWNS: Mutex<CooldownTracker> = Mutex::new(CooldownTracker::new(COOLDOWN));

    // Global rate limiting: timestamps of accepted commands inside the sliding window
    static ref GLOBAL_REQUESTS: Mutex<Vec<Instant>> = Mutex::new(Vec::new());
}

/// Outcome of a rejected command because of cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownHit {
    pub remaining: Duration,
    /// True only for the first rejection of a cooldown period, to avoid reply spam
    pub should_warn: bool,
}

/// Per-user, per-command cooldowns keyed by canonical command name
pub struct CooldownTracker {
    cooldown: Duration,
    last_used: HashMap<(u64, &'static str), Instant>,
    last_warned: HashMap<(u64, &'static str), Instant>,
}

impl CooldownTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_used: HashMap::new(),
            last_warned: HashMap::new(),
        }
    }

    pub fn check(&mut self, user_id: u64, command: &'static str) -> Result<(), CooldownHit> {
        let now = Instant::now();
        let cooldown = self.cooldown;

        // Expired entries carry no state
        self.last_used.retain(|_, &mut t| now.duration_since(t) < cooldown);
        self.last_warned.retain(|_, &mut t| now.duration_since(t) < cooldown);

        let key = (user_id, command);

        if let Some(&last_time) = self.last_used.get(&key) {
            let elapsed = now.duration_since(last_time);
            if elapsed < self.cooldown {
                let should_warn = match self.last_warned.get(&key) {
                    // Only warn once per cooldown period
                    Some(&warned_at) => warned_at < last_time,
                    None => true,
                };
                if should_warn {
                    self.last_warned.insert(key, now);
                }
                return Err(CooldownHit {
                    remaining: self.cooldown - elapsed,
                    should_warn,
                });
            }
        }

        self.last_used.insert(key, now);
        Ok(())
    }

    /// Number of (user, command) pairs currently on cooldown
    pub fn tracked(&self) -> usize {
        self.last_used.len()
    }
}

/// Check if a user can execute a command (cooldown not active)
pub async fn check_cooldown(user_id: u64, command: &'static str) -> Result<(), CooldownHit> {
    COMMAND_COOLDOWNS.lock().await.check(user_id, command)
}

/// Check global rate limit (50 commands per second across all users)
/// Returns Err(remaining) if the limit is exceeded
pub async fn check_global_rate_limit() -> Result<(), Duration> {
    let now = Instant::now();
    let mut requests = GLOBAL_REQUESTS.lock().await;

    requests.retain(|&t| now.duration_since(t) < RATE_WINDOW);

    if requests.len() >= GLOBAL_RATE_LIMIT {
        // The oldest request leaves the window first
        let oldest = requests[0];
        return Err(RATE_WINDOW.saturating_sub(now.duration_since(oldest)));
    }

    requests.push(now);
    Ok(())
}
