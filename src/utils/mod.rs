pub mod table;
pub mod errors;
pub mod ratelimit;
pub mod api_ratelimit;
pub mod shutdown;
pub mod worker_pool;

pub use table::{Align, Table};
pub use errors::extract_clean_error;
pub use ratelimit::{check_cooldown, check_global_rate_limit};
pub use shutdown::Shutdown;
pub use worker_pool::WorkerPool;

use std::time::Duration;

/// Format a duration as `1h 2m 3s`, dropping leading zero units
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
