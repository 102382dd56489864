use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One timestamped total-portfolio-value sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HistorySnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_value: f64,
}

/// Wire shape of a history entry, `{date, value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

impl From<HistorySnapshot> for HistoryPoint {
    fn from(snapshot: HistorySnapshot) -> Self {
        Self {
            date: snapshot.timestamp,
            value: snapshot.total_value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppendSnapshot {
    pub date: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub filter: Option<String>,
}
