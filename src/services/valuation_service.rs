use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ValuationConfig;
use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::{DashboardSummary, Holding, PortfolioValuation, PositionValuation};
use crate::services::pricing_service;
use crate::store::PortfolioStore;

/// Prices one holding, bounded by `price_timeout`; a timed-out position
/// contributes zero.
async fn price_with_timeout(
    provider: &dyn PriceProvider,
    holding: &Holding,
    config: &ValuationConfig,
    now: DateTime<Utc>,
) -> PositionValuation {
    match tokio::time::timeout(config.price_timeout, pricing_service::price_position(provider, holding, now)).await {
        Ok(valuation) => valuation,
        Err(_) => {
            warn!(
                "Pricing {} timed out after {:?}, valuing position at zero",
                holding.ticker, config.price_timeout
            );
            PositionValuation::unpriced(&holding.ticker, holding.amount)
        }
    }
}

/// Prices every active holding and sums the results.
///
/// Lookups run concurrently, at most `max_concurrency` at a time. Positions
/// come back in holdings order.
pub async fn value_portfolio(
    provider: &dyn PriceProvider,
    holdings: &[Holding],
    config: &ValuationConfig,
    now: DateTime<Utc>,
) -> PortfolioValuation {
    let mut lookups = Vec::new();
    for holding in holdings.iter().filter(|h| h.is_active()) {
        lookups.push(price_with_timeout(provider, holding, config, now));
    }

    let positions: Vec<PositionValuation> = stream::iter(lookups)
        .buffered(config.max_concurrency.max(1))
        .collect()
        .await;

    aggregate(positions)
}

/// Sums per-position values into portfolio totals.
pub fn aggregate(positions: Vec<PositionValuation>) -> PortfolioValuation {
    let total_value: f64 = positions.iter().map(|p| p.market_value).sum();
    let total_value_24h_ago: f64 = positions.iter().map(|p| p.value_24h_ago).sum();

    let total_change_percent = if total_value_24h_ago > 0.0 {
        (total_value - total_value_24h_ago) / total_value_24h_ago * 100.0
    } else {
        0.0
    };

    PortfolioValuation {
        total_value,
        total_value_24h_ago,
        total_change_percent,
        positions,
    }
}

/// Full valuation of a user's portfolio; `NotFound` when the user has none.
pub async fn fetch_portfolio(
    store: &dyn PortfolioStore,
    provider: &dyn PriceProvider,
    config: &ValuationConfig,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PortfolioValuation, AppError> {
    if !store.portfolio_exists(user_id).await? {
        return Err(AppError::NotFound(format!("Portfolio not found for user {}", user_id)));
    }
    let holdings = store.get_holdings(user_id).await?;
    Ok(value_portfolio(provider, &holdings, config, now).await)
}

/// Dashboard summary: totals over all holdings, the first
/// `dashboard_top_positions` for display, and the newest notification.
pub async fn dashboard(
    store: &dyn PortfolioStore,
    provider: &dyn PriceProvider,
    config: &ValuationConfig,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DashboardSummary, AppError> {
    let holdings = store.get_holdings(user_id).await?;
    let valuation = value_portfolio(provider, &holdings, config, now).await;
    let last_notification = store.list_notifications(user_id).await?.into_iter().next();

    info!(
        "Dashboard for {}: {} positions, total {:.2} ({:+.2}%)",
        user_id,
        valuation.positions.len(),
        valuation.total_value,
        valuation.total_change_percent
    );

    Ok(DashboardSummary {
        total_value: valuation.total_value,
        total_change_percent: valuation.total_change_percent,
        top_positions: valuation
            .positions
            .into_iter()
            .take(config.dashboard_top_positions)
            .collect(),
        last_notification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Notification;
    use crate::services::pricing_service::tests::{now, StubProvider};
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate};
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    fn acquired() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn config() -> ValuationConfig {
        ValuationConfig {
            price_timeout: StdDuration::from_millis(200),
            max_concurrency: 2,
            dashboard_top_positions: 3,
        }
    }

    #[tokio::test]
    async fn test_zero_amount_holdings_are_excluded() {
        let provider = StubProvider::default()
            .with_series("AAPL", &[140.0, 150.0])
            .with_series("TSLA", &[190.0, 200.0]);
        let holdings = vec![
            Holding::new("AAPL", 2.0, 120.0, acquired()),
            Holding::new("TSLA", 0.0, 180.0, acquired()),
        ];

        let valuation = value_portfolio(&provider, &holdings, &config(), now()).await;

        assert_eq!(valuation.positions.len(), 1);
        assert_eq!(valuation.positions[0].ticker, "AAPL");
        assert!((valuation.total_value - 300.0).abs() < 1e-9);
        assert!((valuation.total_value_24h_ago - 280.0).abs() < 1e-9);
        assert!((valuation.total_change_percent - 7.142857142857143).abs() < 1e-6);
        assert!(!provider.calls.lock().unwrap().iter().any(|c| c.contains("TSLA")));
    }

    #[tokio::test]
    async fn test_one_failing_ticker_contributes_zero() {
        let provider = StubProvider::default()
            .with_series("AAPL", &[100.0, 100.0])
            .with_series("MSFT", &[400.0, 400.0])
            .failing("NFLX");
        let holdings = vec![
            Holding::new("AAPL", 1.0, 90.0, acquired()),
            Holding::new("NFLX", 5.0, 500.0, acquired()),
            Holding::new("MSFT", 1.0, 300.0, acquired()),
        ];

        let valuation = value_portfolio(&provider, &holdings, &config(), now()).await;

        assert_eq!(valuation.positions.len(), 3);
        assert_eq!(valuation.total_value, 500.0);
        let nflx = &valuation.positions[1];
        assert_eq!(nflx.ticker, "NFLX");
        assert!(!nflx.price_available);
        assert_eq!(nflx.market_value, 0.0);
    }

    #[tokio::test]
    async fn test_slow_ticker_times_out_without_stalling_the_rest() {
        let provider = StubProvider::default()
            .with_series("AAPL", &[100.0, 110.0])
            .slow("SLOW");
        let holdings = vec![
            Holding::new("SLOW", 1.0, 10.0, acquired()),
            Holding::new("AAPL", 1.0, 90.0, acquired()),
        ];

        let started = std::time::Instant::now();
        let valuation = value_portfolio(&provider, &holdings, &config(), now()).await;

        assert!(started.elapsed() < StdDuration::from_secs(5));
        assert!(!valuation.positions[0].price_available);
        assert_eq!(valuation.total_value, 110.0);
    }

    #[tokio::test]
    async fn test_empty_portfolio_has_zero_change() {
        let provider = StubProvider::default();
        let valuation = value_portfolio(&provider, &[], &config(), now()).await;

        assert_eq!(valuation.total_value, 0.0);
        assert_eq!(valuation.total_change_percent, 0.0);
        assert!(valuation.positions.is_empty());
    }

    #[test]
    fn test_aggregate_with_zero_previous_total_reports_no_change() {
        let positions = vec![PositionValuation::unpriced("AAPL", 1.0)];
        assert_eq!(aggregate(positions).total_change_percent, 0.0);
    }

    #[tokio::test]
    async fn test_dashboard_shows_first_positions_but_totals_all() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let tickers = ["AAPL", "MSFT", "GOOGL", "AMZN"];
        let mut provider = StubProvider::default();
        let mut holdings = Vec::new();
        for ticker in tickers {
            provider = provider.with_series(ticker, &[10.0, 10.0]);
            holdings.push(Holding::new(ticker, 1.0, 5.0, acquired()));
        }
        store.put_holdings(user, &holdings).await.unwrap();
        let purchase = Notification::purchase(user, "AMZN", "Bought AMZN".into(), now() - Duration::hours(1));
        store.append_notification(purchase.clone()).await.unwrap();

        let summary = dashboard(&store, &provider, &config(), user, now()).await.unwrap();

        assert_eq!(summary.total_value, 40.0);
        assert_eq!(
            summary.top_positions.iter().map(|p| p.ticker.as_str()).collect::<Vec<_>>(),
            vec!["AAPL", "MSFT", "GOOGL"]
        );
        assert_eq!(summary.last_notification, Some(purchase));
    }

    #[tokio::test]
    async fn test_valuation_runs_on_spawned_task_from_shared_handles() {
        let store: Arc<dyn PortfolioStore> = Arc::new(MemoryStore::new());
        let provider: Arc<dyn PriceProvider> = Arc::new(StubProvider::default().with_series("AAPL", &[100.0, 120.0]));
        let user = Uuid::new_v4();
        store
            .put_holdings(user, &[Holding::new("AAPL", 1.0, 90.0, acquired())])
            .await
            .unwrap();

        let task = tokio::spawn(async move {
            fetch_portfolio(store.as_ref(), provider.as_ref(), &config(), user, now()).await
        });

        let valuation = task.await.unwrap().unwrap();
        assert_eq!(valuation.total_value, 120.0);
    }

    #[tokio::test]
    async fn test_fetch_portfolio_for_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let provider = StubProvider::default();
        let result = fetch_portfolio(&store, &provider, &config(), Uuid::new_v4(), now()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
