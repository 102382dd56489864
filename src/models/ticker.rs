use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerMatch {
    pub symbol: String,
    pub name: String,
    pub market: Option<String>,
    pub primary_exchange: Option<String>,
    pub currency: Option<String>,
}

/// Reference data for a single listed ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerDetails {
    pub ticker: String,
    pub name: String,
    pub locale: Option<String>,
    pub market_cap: Option<f64>,
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub homepage_url: Option<String>,
    pub total_employees: Option<u64>,
    pub list_date: Option<String>,
    pub share_class_shares_outstanding: Option<f64>,
    pub weighted_shares_outstanding: Option<f64>,
    pub round_lot: Option<u32>,
}
