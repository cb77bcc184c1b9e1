use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use super::models::TickersResponse;
use crate::api::QuoteSource;
use crate::models::{Quote, Symbol};
use crate::utils::api_ratelimit::ApiRateLimiter;
use crate::utils::errors::{ApiError, FetchError};

/// Bybit v5 market-data client for spot tickers
pub struct BybitClient {
    http_client: HttpClient,
    base_url: String,
    limiter: ApiRateLimiter,
}

impl BybitClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.bybit.com/v5/market/tickers";
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a client with a custom tickers URL (staging, proxies, tests)
    pub fn with_base_url(base_url: String) -> Result<Self, ApiError> {
        let http_client = HttpClient::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            limiter: ApiRateLimiter::default(),
        })
    }

    /// Map a non-success HTTP status to an error
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let status_code = status.as_u16();
        let body_text = response.text().await.unwrap_or_default();

        match status_code {
            429 => {
                warn!("Rate limited by quote API: {}", body_text);
                ApiError::RateLimited(body_text)
            }
            500..=599 => {
                warn!("Server error {}: {}", status_code, body_text);
                ApiError::ServerError(status_code, body_text)
            }
            _ => ApiError::HttpError(status_code, body_text),
        }
    }

    /// GET {base}?category=spot&symbol={SYMBOL}USDT
    ///
    /// Returns the last traded price for one symbol.
    pub async fn get_ticker(&self, symbol: Symbol) -> Result<Quote, ApiError> {
        debug!(%symbol, "Get price by symbol");
        self.limiter.acquire().await;

        let pair = symbol.spot_pair();
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("category", "spot"), ("symbol", pair.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::RequestError(format!("Failed to read body: {}", e)))?;

        let quote = parse_ticker_response(&body, symbol)?;
        debug!(%symbol, price = %quote.price, "Got price by symbol");
        Ok(quote)
    }
}

/// Decode a tickers body into a quote for `symbol`
pub fn parse_ticker_response(body: &str, symbol: Symbol) -> Result<Quote, ApiError> {
    let parsed: TickersResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))?;

    if parsed.ret_code != 0 {
        return Err(ApiError::ApiCode {
            code: parsed.ret_code,
            message: parsed.ret_msg,
        });
    }

    let ticker = parsed
        .result
        .list
        .into_iter()
        .next()
        .ok_or(ApiError::NoData(symbol))?;

    if ticker.last_price.trim().is_empty() {
        return Err(ApiError::NoData(symbol));
    }

    Ok(Quote {
        symbol,
        price: ticker.last_price,
        observed_at: Utc::now(),
    })
}

#[async_trait]
impl QuoteSource for BybitClient {
    async fn fetch_one(&self, symbol: Symbol) -> Result<Quote, FetchError> {
        Ok(self.get_ticker(symbol).await?)
    }
}
