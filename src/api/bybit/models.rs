use serde::{Deserialize, Serialize};

/// Envelope returned by `GET /v5/market/tickers`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickersResponse {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    #[serde(default)]
    pub result: TickersResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickersResult {
    #[serde(default)]
    pub list: Vec<TickerInfo>,
}

/// One spot ticker. Only the fields we use are decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerInfo {
    pub symbol: String,
    pub last_price: String,
}
