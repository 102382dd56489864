use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A closing price for a ticker at a bar's start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// Chart point as the frontend plots it.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub x: DateTime<Utc>,
    pub y: f64,
}

impl From<PricePoint> for ChartPoint {
    fn from(point: PricePoint) -> Self {
        Self {
            x: point.timestamp,
            y: point.close,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub price: f64,
    pub percentage_change: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub ticker: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceChangeQuery {
    pub compare: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesQuery {
    pub from: Option<String>,
    pub timespan: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}
