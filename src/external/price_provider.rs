use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{PricePoint, TickerDetails, TickerMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Hour,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Hour => "hour",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = PriceProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "hour" => Ok(Granularity::Hour),
            other => Err(PriceProviderError::InvalidRequest(format!(
                "unsupported granularity '{}', expected 'day' or 'hour'",
                other
            ))),
        }
    }
}

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Remote market-data source.
///
/// `Ok(None)` / an empty series means the provider answered but has no data;
/// `Err` means the lookup itself failed. Closes that are zero or negative are
/// never returned. Implementations do not retry.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn latest_close(&self, ticker: &str) -> Result<Option<PricePoint>, PriceProviderError>;

    /// Close prices over `[from, to]`, ascending by timestamp.
    async fn price_series(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
        granularity: Granularity,
    ) -> Result<Vec<PricePoint>, PriceProviderError>;

    async fn ticker_details(&self, ticker: &str) -> Result<Option<TickerDetails>, PriceProviderError>;

    async fn search_tickers(&self, keyword: &str) -> Result<Vec<TickerMatch>, PriceProviderError>;
}

/// Input checks shared by provider implementations.
pub fn validate_series_request(ticker: &str, from: NaiveDate, to: NaiveDate) -> Result<(), PriceProviderError> {
    validate_ticker(ticker)?;
    if from > to {
        return Err(PriceProviderError::InvalidRequest(format!(
            "range start {} is after range end {}",
            from, to
        )));
    }
    Ok(())
}

pub fn validate_ticker(ticker: &str) -> Result<(), PriceProviderError> {
    if ticker.trim().is_empty() {
        return Err(PriceProviderError::InvalidRequest("ticker cannot be empty".into()));
    }
    Ok(())
}
