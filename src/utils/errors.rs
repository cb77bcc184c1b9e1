use std::time::Duration;

use thiserror::Error;

use crate::models::Symbol;

/// Errors from the market-data HTTP API
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    #[error("Server Error ({0}): {1}")]
    ServerError(u16, String),
    #[error("Rate Limited: {0}")]
    RateLimited(String),
    #[error("API Error ({code}): {message}")]
    ApiCode { code: i64, message: String },
    #[error("No data for symbol: {0}")]
    NoData(Symbol),
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
    #[error("Client build error: {0}")]
    ClientBuild(String),
}

/// Errors surfaced by quote sources and the cached fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("quote source unavailable: {0}")]
    Source(#[from] ApiError),
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to get prices after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Errors from the notification transport
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid recipient id: {0}")]
    InvalidRecipient(u64),
    #[error("Discord error: {0}")]
    Discord(String),
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

impl From<serenity::Error> for DeliveryError {
    fn from(e: serenity::Error) -> Self {
        DeliveryError::Discord(e.to_string())
    }
}

/// Top-level service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("failed to save some prices: {}", .0.join("; "))]
    Persist(Vec<String>),
    #[error("operation cancelled")]
    Cancelled,
}

/// Extract clean error message from database error strings
///
/// Removes technical error codes and prefixes like:
/// "error returned from database: 1146 (42S02): Table 'coinpulse.subscriber' doesn't exist"
///
/// Returns only the meaningful error message:
/// "Table 'coinpulse.subscriber' doesn't exist"
pub fn extract_clean_error(error_msg: &str) -> String {
    if error_msg.contains("error returned from database:") {
        // Everything after the last colon is the actual error message
        if let Some(last_colon) = error_msg.rfind(": ") {
            error_msg[last_colon + 2..].trim().to_string()
        } else {
            error_msg.to_string()
        }
    } else {
        error_msg.to_string()
    }
}
