pub mod bybit;
pub mod cached;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::models::{PriceSet, Quote, Symbol};
use crate::utils::errors::FetchError;

pub use bybit::BybitClient;
pub use cached::CachedQuoteSource;

/// Anything that can produce current quotes for the tracked symbols
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_one(&self, symbol: Symbol) -> Result<Quote, FetchError>;

    /// Fetch every tracked symbol concurrently.
    ///
    /// A symbol that fails is left out of the set; only a total failure is an error.
    async fn fetch_all(&self) -> Result<PriceSet, FetchError> {
        fetch_symbols(self, &Symbol::ALL).await
    }
}

/// Fetch `symbols` concurrently from `source`, swallowing per-symbol failures.
///
/// Returns the last per-symbol error if no symbol could be fetched.
pub async fn fetch_symbols<S>(source: &S, symbols: &[Symbol]) -> Result<PriceSet, FetchError>
where
    S: QuoteSource + ?Sized,
{
    let results = join_all(
        symbols
            .iter()
            .map(|&symbol| async move { (symbol, source.fetch_one(symbol).await) }),
    )
    .await;

    let mut quotes = Vec::with_capacity(results.len());
    let mut last_error = None;

    for (symbol, result) in results {
        match result {
            Ok(quote) => quotes.push(quote),
            Err(e) => {
                warn!(%symbol, error = %e, "Failed to get price by symbol");
                last_error = Some(e);
            }
        }
    }

    if quotes.is_empty() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    Ok(PriceSet::from_quotes(quotes))
}
