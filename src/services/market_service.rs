use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::price_provider::{Granularity, PriceProvider};
use crate::models::{ChartPoint, PriceChange, PricePoint, QuoteSummary, TickerDetails, TickerMatch};
use crate::services::holding_service;

/// Watch list shown on the landing page.
pub const POPULAR_STOCKS: [(&str, &str); 5] = [
    ("AAPL", "Apple Inc."),
    ("GOOGL", "Alphabet Inc."),
    ("TSLA", "Tesla Inc."),
    ("MSFT", "Microsoft Corp."),
    ("AMZN", "Amazon.com Inc."),
];

pub const DEFAULT_COMPARE_DAYS: u32 = 1;

fn default_series_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn normalize(ticker: &str) -> Result<String, AppError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Validation("Ticker is required".into()));
    }
    Ok(ticker)
}

pub async fn previous_close(provider: &dyn PriceProvider, ticker: &str) -> Result<PricePoint, AppError> {
    let ticker = normalize(ticker)?;
    provider
        .latest_close(&ticker)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No previous close for {}", ticker)))
}

/// Last hourly close and its percent change from the first close `compare_days` ago,
/// both rounded to cents.
pub async fn price_change(
    provider: &dyn PriceProvider,
    ticker: &str,
    compare_days: Option<u32>,
    now: DateTime<Utc>,
) -> Result<PriceChange, AppError> {
    let ticker = normalize(ticker)?;
    let days = compare_days.unwrap_or(DEFAULT_COMPARE_DAYS).max(1);
    let to = now.date_naive();
    let from = to
        .checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| AppError::Validation(format!("Cannot compare against {} days ago", days)))?;

    let points = provider.price_series(&ticker, from, to, Granularity::Hour).await?;
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (round2(first.close), round2(last.close)),
        _ => return Err(AppError::NotFound(format!("No data available for {}", ticker))),
    };

    let percentage_change = if first > 0.0 {
        round2((last - first) / first * 100.0)
    } else {
        0.0
    };

    Ok(PriceChange {
        price: last,
        percentage_change,
    })
}

/// Chart series from `from` (default 2021-01-01) to today.
pub async fn series(
    provider: &dyn PriceProvider,
    ticker: &str,
    from: Option<&str>,
    timespan: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<ChartPoint>, AppError> {
    let ticker = normalize(ticker)?;
    let from = match from.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => holding_service::parse_date(raw)?,
        None => default_series_start(),
    };
    let granularity = match timespan.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<Granularity>()?,
        None => Granularity::Day,
    };

    let points = provider
        .price_series(&ticker, from, now.date_naive(), granularity)
        .await?;
    Ok(points.into_iter().map(ChartPoint::from).collect())
}

pub async fn details(provider: &dyn PriceProvider, ticker: &str) -> Result<TickerDetails, AppError> {
    let ticker = normalize(ticker)?;
    provider
        .ticker_details(&ticker)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticker {} not found", ticker)))
}

pub async fn search(provider: &dyn PriceProvider, query: Option<&str>) -> Result<Vec<TickerMatch>, AppError> {
    let query = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("query is required".into()))?;

    Ok(provider.search_tickers(query).await?)
}

/// Previous close of every popular stock, fetched concurrently. A failed
/// lookup is reported on its own entry rather than failing the list.
pub async fn popular(provider: &dyn PriceProvider) -> Vec<QuoteSummary> {
    let lookups = POPULAR_STOCKS.iter().map(|(ticker, name)| async move {
        let (price, error) = match provider.latest_close(ticker).await {
            Ok(Some(point)) => (Some(point.close), None),
            Ok(None) => (None, Some("Price not available".to_string())),
            Err(e) => {
                warn!("Popular quote for {} failed: {}", ticker, e);
                (None, Some("Failed to load price".to_string()))
            }
        };
        QuoteSummary {
            ticker: ticker.to_string(),
            name: name.to_string(),
            price,
            error,
        }
    });

    let quotes = join_all(lookups).await;
    info!("Loaded {} popular quotes", quotes.iter().filter(|q| q.price.is_some()).count());
    quotes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing_service::tests::{now, StubProvider};

    #[tokio::test]
    async fn test_price_change_rounds_to_cents() {
        let provider = StubProvider::default().with_series("AAPL", &[150.004, 151.2, 153.456]);

        let change = price_change(&provider, "aapl", None, now()).await.unwrap();

        assert_eq!(change.price, 153.46);
        assert_eq!(change.percentage_change, 2.31);
        let calls = provider.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["series:AAPL:2024-06-13:2024-06-14".to_string()]);
    }

    #[tokio::test]
    async fn test_price_change_without_bars_is_not_found() {
        let provider = StubProvider::default();
        let result = price_change(&provider, "AAPL", Some(7), now()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_price_change_rejects_compare_before_calendar_start() {
        let provider = StubProvider::default().with_series("AAPL", &[150.0, 151.0]);

        let result = price_change(&provider, "AAPL", Some(u32::MAX), now()).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_series_defaults_and_timespan_validation() {
        let provider = StubProvider::default().with_series("TSLA", &[200.0, 210.0]);

        let points = series(&provider, "TSLA", None, None, now()).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].y, 210.0);
        assert_eq!(
            provider.calls.lock().unwrap()[0],
            "series:TSLA:2021-01-01:2024-06-14".to_string()
        );

        let bad = series(&provider, "TSLA", None, Some("minute"), now()).await;
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_popular_reports_failures_per_entry() {
        let provider = StubProvider::default()
            .with_latest("AAPL", 190.0)
            .with_latest("GOOGL", 170.0)
            .with_latest("MSFT", 420.0)
            .with_latest("AMZN", 180.0)
            .failing("TSLA");

        let quotes = popular(&provider).await;

        assert_eq!(quotes.len(), 5);
        assert_eq!(quotes[0].price, Some(190.0));
        assert_eq!(quotes[2].ticker, "TSLA");
        assert_eq!(quotes[2].price, None);
        assert!(quotes[2].error.is_some());
    }

    #[tokio::test]
    async fn test_missing_lookups() {
        let provider = StubProvider::default();
        assert!(matches!(previous_close(&provider, "ZZZZ").await, Err(AppError::NotFound(_))));
        assert!(matches!(details(&provider, "ZZZZ").await, Err(AppError::NotFound(_))));
        assert!(matches!(search(&provider, Some(" ")).await, Err(AppError::Validation(_))));
        assert!(search(&provider, Some("app")).await.unwrap().is_empty());
    }
}
