pub mod discord;

use async_trait::async_trait;

use crate::utils::errors::DeliveryError;

pub use discord::DiscordNotifier;

/// One-shot text delivery to a subscriber. Implementations never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, recipient_id: u64, payload: &str) -> Result<(), DeliveryError>;

    /// Cheap round trip proving the transport is reachable
    async fn check(&self) -> Result<(), DeliveryError>;
}
