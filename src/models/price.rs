//! Quote and price set models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tracked tickers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Symbol {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "ETH")]
    Eth,
}

impl Symbol {
    pub const ALL: [Symbol; 2] = [Symbol::Btc, Symbol::Eth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Btc => "BTC",
            Symbol::Eth => "ETH",
        }
    }

    /// Human readable asset name
    pub fn display_name(&self) -> &'static str {
        match self {
            Symbol::Btc => "Bitcoin",
            Symbol::Eth => "Ethereum",
        }
    }

    /// Spot pair quoted against USDT on the exchange, e.g. `BTCUSDT`
    pub fn spot_pair(&self) -> String {
        format!("{}USDT", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BTC" => Ok(Symbol::Btc),
            "ETH" => Ok(Symbol::Eth),
            other => Err(format!("Unknown symbol: '{}'", other)),
        }
    }
}

/// A single observed price. The price is kept as the exchange's decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: String,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: Symbol, price: impl Into<String>) -> Self {
        Self {
            symbol,
            price: price.into(),
            observed_at: Utc::now(),
        }
    }
}

/// Latest quote per tracked symbol. A missing entry means the symbol could not be fetched.
///
/// Built once and never mutated afterwards; updates produce a new set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriceSet {
    quotes: BTreeMap<Symbol, Quote>,
}

impl PriceSet {
    pub fn from_quotes(quotes: impl IntoIterator<Item = Quote>) -> Self {
        Self {
            quotes: quotes.into_iter().map(|q| (q.symbol, q)).collect(),
        }
    }

    pub fn get(&self, symbol: Symbol) -> Option<&Quote> {
        self.quotes.get(&symbol)
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.quotes.contains_key(&symbol)
    }

    /// Quotes in symbol order
    pub fn iter(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.values()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Symbols from `Symbol::ALL` without a quote
    pub fn missing(&self) -> Vec<Symbol> {
        Symbol::ALL
            .iter()
            .copied()
            .filter(|s| !self.contains(*s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_parse_and_display() {
        assert_eq!("btc".parse::<Symbol>(), Ok(Symbol::Btc));
        assert_eq!(" ETH ".parse::<Symbol>(), Ok(Symbol::Eth));
        assert!("DOGE".parse::<Symbol>().is_err());
        assert_eq!(Symbol::Eth.to_string(), "ETH");
        assert_eq!(Symbol::Btc.spot_pair(), "BTCUSDT");
    }

    #[test]
    fn test_partial_price_set() {
        let set = PriceSet::from_quotes(vec![Quote::new(Symbol::Eth, "3100.5")]);

        assert_eq!(set.len(), 1);
        assert!(set.get(Symbol::Btc).is_none());
        assert_eq!(set.get(Symbol::Eth).map(|q| q.price.as_str()), Some("3100.5"));
        assert_eq!(set.missing(), vec![Symbol::Btc]);
    }

    #[test]
    fn test_later_quote_for_same_symbol_wins() {
        let set = PriceSet::from_quotes(vec![
            Quote::new(Symbol::Btc, "1"),
            Quote::new(Symbol::Btc, "2"),
        ]);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(Symbol::Btc).map(|q| q.price.as_str()), Some("2"));
    }
}
