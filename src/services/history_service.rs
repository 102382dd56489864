use chrono::{DateTime, Months, Utc};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::config::ValuationConfig;
use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::HistorySnapshot;
use crate::services::valuation_service;
use crate::store::PortfolioStore;

/// Lookback window for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFilter {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    All,
}

impl FromStr for HistoryFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1M" => Ok(HistoryFilter::OneMonth),
            "3M" => Ok(HistoryFilter::ThreeMonths),
            "6M" => Ok(HistoryFilter::SixMonths),
            "1Y" => Ok(HistoryFilter::OneYear),
            "ALL" => Ok(HistoryFilter::All),
            other => Err(AppError::InvalidFilter(format!(
                "Unknown history filter '{}', expected one of 1M, 3M, 6M, 1Y, ALL",
                other
            ))),
        }
    }
}

impl HistoryFilter {
    fn months(&self) -> Option<u32> {
        match self {
            HistoryFilter::OneMonth => Some(1),
            HistoryFilter::ThreeMonths => Some(3),
            HistoryFilter::SixMonths => Some(6),
            HistoryFilter::OneYear => Some(12),
            HistoryFilter::All => None,
        }
    }

    /// Earliest timestamp kept by this filter, by calendar-month subtraction
    /// (Mar 31 minus one month is Feb 29/28). `None` keeps everything.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.months().map(|m| {
            now.checked_sub_months(Months::new(m))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }
}

/// Sorts snapshots by timestamp and drops those older than the filter cutoff.
pub fn filter_history(mut snapshots: Vec<HistorySnapshot>, filter: HistoryFilter, now: DateTime<Utc>) -> Vec<HistorySnapshot> {
    snapshots.sort_by_key(|s| s.timestamp);
    match filter.cutoff(now) {
        Some(cutoff) => snapshots.into_iter().filter(|s| s.timestamp >= cutoff).collect(),
        None => snapshots,
    }
}

/// History for a user; a missing filter means `ALL`.
pub async fn get_history(
    store: &dyn PortfolioStore,
    user_id: Uuid,
    filter: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<HistorySnapshot>, AppError> {
    let filter = filter.map(HistoryFilter::from_str).transpose()?.unwrap_or(HistoryFilter::All);
    let snapshots = store.get_history(user_id).await?;
    Ok(filter_history(snapshots, filter, now))
}

pub async fn append_snapshot(
    store: &dyn PortfolioStore,
    user_id: Uuid,
    timestamp: DateTime<Utc>,
    total_value: f64,
) -> Result<HistorySnapshot, AppError> {
    if !total_value.is_finite() || total_value < 0.0 {
        return Err(AppError::Validation(format!(
            "History value must be a non-negative number, got {}",
            total_value
        )));
    }

    let snapshot = HistorySnapshot { timestamp, total_value };
    store.append_history(user_id, snapshot.clone()).await?;
    Ok(snapshot)
}

/// Values the portfolio now and appends the total as a snapshot.
pub async fn record_current_value(
    store: &dyn PortfolioStore,
    provider: &dyn PriceProvider,
    config: &ValuationConfig,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<HistorySnapshot, AppError> {
    let valuation = valuation_service::fetch_portfolio(store, provider, config, user_id, now).await?;
    let snapshot = append_snapshot(store, user_id, now, valuation.total_value).await?;
    info!("Recorded portfolio value {:.2} for user {}", snapshot.total_value, user_id);
    Ok(snapshot)
}
