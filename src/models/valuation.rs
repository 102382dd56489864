use serde::Serialize;

use super::Notification;

/// Per-holding valuation. Derived on every request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValuation {
    pub ticker: String,
    pub amount: f64,
    pub current_price: f64,
    pub change_percent: f64,
    pub market_value: f64,
    pub value_24h_ago: f64,
    pub price_available: bool,
}

impl PositionValuation {
    /// Zero contribution for a holding whose price could not be resolved.
    pub fn unpriced(ticker: &str, amount: f64) -> Self {
        Self {
            ticker: ticker.to_string(),
            amount,
            current_price: 0.0,
            change_percent: 0.0,
            market_value: 0.0,
            value_24h_ago: 0.0,
            price_available: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub total_value: f64,
    pub total_value_24h_ago: f64,
    pub total_change_percent: f64,
    pub positions: Vec<PositionValuation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_value: f64,
    pub total_change_percent: f64,
    pub top_positions: Vec<PositionValuation>,
    pub last_notification: Option<Notification>,
}
