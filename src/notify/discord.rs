use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::builder::CreateMessage;
use serenity::http::Http;
use serenity::model::id::UserId;
use tracing::debug;

use super::Notifier;
use crate::utils::errors::DeliveryError;

/// Upper bound for opening the DM channel and sending one message
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers price updates as Discord direct messages
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn send_dm(&self, recipient_id: u64, payload: &str) -> Result<(), DeliveryError> {
        let channel = UserId::new(recipient_id)
            .create_dm_channel(self.http.as_ref())
            .await?;

        channel
            .id
            .send_message(self.http.as_ref(), CreateMessage::default().content(payload))
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn deliver(&self, recipient_id: u64, payload: &str) -> Result<(), DeliveryError> {
        if recipient_id == 0 {
            return Err(DeliveryError::InvalidRecipient(recipient_id));
        }

        tokio::time::timeout(DELIVERY_TIMEOUT, self.send_dm(recipient_id, payload))
            .await
            .map_err(|_| DeliveryError::Timeout(DELIVERY_TIMEOUT))??;

        debug!(recipient_id, "Message delivered");
        Ok(())
    }

    async fn check(&self) -> Result<(), DeliveryError> {
        let user = self.http.get_current_user().await?;
        debug!(bot = %user.name, "Discord API check passed");
        Ok(())
    }
}
