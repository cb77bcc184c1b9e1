//! Data models shared by commands and services
//!
//! Each model represents either domain data (quotes, subscribers) or the
//! output of a service operation rendered by a command.

pub mod price;
pub mod subscriber;
pub mod health;
pub mod ping;

// Re-export commonly used types for convenience
pub use price::{PriceSet, Quote, Symbol};
pub use subscriber::Subscriber;
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use ping::PingMetrics;
