use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::price_provider::{Granularity, PriceProvider, PriceProviderError};
use crate::models::{Holding, Notification};
use crate::services::notification_service;
use crate::store::PortfolioStore;

const AMOUNT_EPSILON: f64 = 1e-9;

pub fn parse_user_id(raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("userId is required".into()))?;

    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid userId: {}", raw)))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc).date_naive()))
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

fn validate_trade(ticker: &str, amount: f64, date: NaiveDate, now: DateTime<Utc>) -> Result<String, AppError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Validation("Ticker is required".into()));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::Validation(format!("Amount must be positive, got {}", amount)));
    }
    if date > now.date_naive() {
        return Err(AppError::Validation(format!("Date {} is in the future", date)));
    }
    Ok(ticker)
}

/// Close price on the purchase date. Same-day purchases use the latest close.
async fn resolve_purchase_price(
    provider: &dyn PriceProvider,
    ticker: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<f64, AppError> {
    let lookup = if date == now.date_naive() {
        provider.latest_close(ticker).await.map(|p| p.map(|p| p.close))
    } else {
        provider
            .price_series(ticker, date, date, Granularity::Day)
            .await
            .map(|points| points.first().map(|p| p.close))
    };

    match lookup {
        Ok(Some(price)) => Ok(price),
        Ok(None) => Err(AppError::PriceUnavailable(format!("No price for {} on {}", ticker, date))),
        Err(PriceProviderError::RateLimited) => Err(AppError::RateLimited),
        Err(e) => {
            warn!("Purchase price lookup failed for {} on {}: {}", ticker, date, e);
            Err(AppError::PriceUnavailable(format!("Could not price {} on {}", ticker, date)))
        }
    }
}

/// Appends a holding priced at the purchase date and records a purchase
/// notification. Creates the portfolio on first purchase.
///
/// The holding is the committed result: a failed notification write is
/// logged and yields `None` rather than failing the purchase.
pub async fn add_position(
    store: &dyn PortfolioStore,
    provider: &dyn PriceProvider,
    user_id: Uuid,
    ticker: &str,
    amount: f64,
    date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<(Holding, Option<Notification>), AppError> {
    let date = date.unwrap_or_else(|| now.date_naive());
    let ticker = validate_trade(ticker, amount, date, now)?;

    let price = resolve_purchase_price(provider, &ticker, date, now).await?;
    let holding = Holding::new(&ticker, amount, price, date);
    store.put_holdings(user_id, std::slice::from_ref(&holding)).await?;

    info!("Added {} x {} at {:.2} for user {}", amount, ticker, price, user_id);
    let notification = match notification_service::record_purchase(store, user_id, &ticker, amount, price, now).await {
        Ok(notification) => Some(notification),
        Err(e) => {
            warn!("Holding {} stored but purchase notification failed: {}", holding.id, e);
            None
        }
    };

    Ok((holding, notification))
}

/// Disposes of `amount` shares oldest acquisition first. Lots that are fully
/// sold are closed at `date`, which is checked only against consumed lots.
/// Returns the shares of `ticker` still held.
pub async fn sell_position(
    store: &dyn PortfolioStore,
    user_id: Uuid,
    ticker: &str,
    amount: f64,
    date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<f64, AppError> {
    let date = date.unwrap_or_else(|| now.date_naive());
    let ticker = validate_trade(ticker, amount, date, now)?;

    if !store.portfolio_exists(user_id).await? {
        return Err(AppError::NotFound(format!("Portfolio not found for user {}", user_id)));
    }

    let mut lots: Vec<Holding> = store
        .get_holdings(user_id)
        .await?
        .into_iter()
        .filter(|h| h.ticker == ticker && h.is_active())
        .collect();
    // Stable sort: same-day lots keep ledger order.
    lots.sort_by_key(|h| h.acquisition_date);

    let held: f64 = lots.iter().map(|h| h.amount).sum();
    if lots.is_empty() {
        return Err(AppError::NotFound(format!("No open position in {}", ticker)));
    }
    if amount > held + AMOUNT_EPSILON {
        return Err(AppError::Validation(format!(
            "Cannot sell {} {}: only {} held",
            amount, ticker, held
        )));
    }

    let mut remaining = amount;
    let mut touched = Vec::new();
    for lot in lots.iter_mut() {
        if remaining <= AMOUNT_EPSILON {
            break;
        }
        if date < lot.acquisition_date {
            return Err(AppError::Validation(format!(
                "Sell date {} is before the {} purchase on {}",
                date, ticker, lot.acquisition_date
            )));
        }

        let take = remaining.min(lot.amount);
        lot.amount -= take;
        remaining -= take;
        if lot.amount <= AMOUNT_EPSILON {
            lot.amount = 0.0;
            lot.disposal_date = Some(date);
        }
        touched.push(lot.clone());
    }

    store.put_holdings(user_id, &touched).await?;

    let left = (held - amount).max(0.0);
    info!("Sold {} x {} for user {}, {} left", amount, ticker, user_id, left);
    Ok(left)
}

/// Distinct tickers of active holdings, in ledger order.
pub async fn list_tickers(store: &dyn PortfolioStore, user_id: Uuid) -> Result<Vec<String>, AppError> {
    let mut tickers: Vec<String> = Vec::new();
    for holding in store.get_holdings(user_id).await? {
        if holding.is_active() && !tickers.contains(&holding.ticker) {
            tickers.push(holding.ticker);
        }
    }
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistorySnapshot, NotificationKind};
    use crate::services::pricing_service::tests::{now, StubProvider};
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;

    /// Memory store whose notification writes always fail.
    struct NotificationsDown(MemoryStore);

    #[async_trait]
    impl PortfolioStore for NotificationsDown {
        async fn get_holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, StoreError> {
            self.0.get_holdings(user_id).await
        }

        async fn put_holdings(&self, user_id: Uuid, holdings: &[Holding]) -> Result<(), StoreError> {
            self.0.put_holdings(user_id, holdings).await
        }

        async fn portfolio_exists(&self, user_id: Uuid) -> Result<bool, StoreError> {
            self.0.portfolio_exists(user_id).await
        }

        async fn append_history(&self, user_id: Uuid, snapshot: HistorySnapshot) -> Result<(), StoreError> {
            self.0.append_history(user_id, snapshot).await
        }

        async fn get_history(&self, user_id: Uuid) -> Result<Vec<HistorySnapshot>, StoreError> {
            self.0.get_history(user_id).await
        }

        async fn append_notification(&self, _notification: Notification) -> Result<(), StoreError> {
            Err(StoreError::Corrupt("notifications unavailable".into()))
        }

        async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
            self.0.list_notifications(user_id).await
        }

        async fn mark_notification_seen(&self, user_id: Uuid, notification_id: Uuid) -> Result<bool, StoreError> {
            self.0.mark_notification_seen(user_id, notification_id).await
        }

        async fn close(&self) {}
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_user_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_user_id(Some(&id.to_string())).unwrap(), id);
        assert!(matches!(parse_user_id(None), Err(AppError::Validation(_))));
        assert!(matches!(parse_user_id(Some("  ")), Err(AppError::Validation(_))));
        assert!(matches!(parse_user_id(Some("abc")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-05").unwrap(), day(2024, 3, 5));
        assert_eq!(parse_date("2024-03-05T22:10:00Z").unwrap(), day(2024, 3, 5));
        assert!(parse_date("05/03/2024").is_err());
    }

    #[tokio::test]
    async fn test_same_day_purchase_records_notification() {
        let store = MemoryStore::new();
        let provider = StubProvider::default().with_latest("MSFT", 410.0);
        let user = Uuid::new_v4();

        let (holding, notification) = add_position(&store, &provider, user, "msft", 5.0, None, now())
            .await
            .unwrap();
        let notification = notification.unwrap();

        assert_eq!(holding.ticker, "MSFT");
        assert_eq!(holding.acquisition_price, 410.0);
        assert_eq!(holding.acquisition_date, now().date_naive());
        assert_eq!(store.get_holdings(user).await.unwrap(), vec![holding]);

        let stored = store.list_notifications(user).await.unwrap();
        assert_eq!(stored, vec![notification.clone()]);
        assert_eq!(notification.kind, NotificationKind::Purchase);
        assert_eq!(notification.related_ticker.as_deref(), Some("MSFT"));
        assert!(!notification.seen);
    }

    #[tokio::test]
    async fn test_purchase_survives_failed_notification_write() {
        let store = NotificationsDown(MemoryStore::new());
        let provider = StubProvider::default().with_latest("MSFT", 410.0);
        let user = Uuid::new_v4();

        let (holding, notification) = add_position(&store, &provider, user, "MSFT", 5.0, None, now())
            .await
            .unwrap();

        assert!(notification.is_none());
        assert_eq!(store.get_holdings(user).await.unwrap(), vec![holding]);
        assert!(store.list_notifications(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_past_purchase_is_priced_on_that_day() {
        let store = MemoryStore::new();
        let provider = StubProvider::default().with_series("AAPL", &[182.5]);
        let user = Uuid::new_v4();

        let (holding, _) = add_position(&store, &provider, user, "AAPL", 2.0, Some(day(2024, 3, 1)), now())
            .await
            .unwrap();

        assert_eq!(holding.acquisition_price, 182.5);
        let calls = provider.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["series:AAPL:2024-03-01:2024-03-01".to_string()]);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input_without_writing() {
        let store = MemoryStore::new();
        let provider = StubProvider::default().with_latest("MSFT", 410.0);
        let user = Uuid::new_v4();
        let tomorrow = now().date_naive().succ_opt().unwrap();

        for (ticker, amount, date) in [("", 1.0, None), ("MSFT", 0.0, None), ("MSFT", -2.0, None), ("MSFT", 1.0, Some(tomorrow))] {
            let result = add_position(&store, &provider, user, ticker, amount, date, now()).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
        assert!(!store.portfolio_exists(user).await.unwrap());
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_without_price_fails_and_stores_nothing() {
        let store = MemoryStore::new();
        let provider = StubProvider::default().failing("NFLX");
        let user = Uuid::new_v4();

        let missing = add_position(&store, &provider, user, "ZZZZ", 1.0, None, now()).await;
        assert!(matches!(missing, Err(AppError::PriceUnavailable(_))));

        let failed = add_position(&store, &provider, user, "NFLX", 1.0, None, now()).await;
        assert!(matches!(failed, Err(AppError::PriceUnavailable(_))));

        assert!(store.get_holdings(user).await.unwrap().is_empty());
        assert!(store.list_notifications(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sell_consumes_oldest_lots_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let first = Holding::new("AAPL", 3.0, 150.0, day(2024, 1, 2));
        let second = Holding::new("AAPL", 4.0, 170.0, day(2024, 2, 2));
        store.put_holdings(user, &[first.clone(), second.clone()]).await.unwrap();

        let left = sell_position(&store, user, "AAPL", 5.0, Some(day(2024, 6, 1)), now()).await.unwrap();
        assert_eq!(left, 2.0);

        let holdings = store.get_holdings(user).await.unwrap();
        assert_eq!(holdings[0].id, first.id);
        assert_eq!(holdings[0].amount, 0.0);
        assert_eq!(holdings[0].disposal_date, Some(day(2024, 6, 1)));
        assert_eq!(holdings[1].amount, 2.0);
        assert!(holdings[1].is_active());
        assert_eq!(list_tickers(&store, user).await.unwrap(), vec!["AAPL".to_string()]);
    }

    #[tokio::test]
    async fn test_sell_consumes_backdated_lot_before_newer_ledger_entry() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let march = Holding::new("AAPL", 2.0, 170.0, day(2024, 3, 1));
        let january = Holding::new("AAPL", 2.0, 150.0, day(2024, 1, 2));
        store.put_holdings(user, &[march.clone(), january.clone()]).await.unwrap();

        let left = sell_position(&store, user, "AAPL", 1.0, Some(day(2024, 2, 1)), now()).await.unwrap();
        assert_eq!(left, 3.0);

        let left = sell_position(&store, user, "AAPL", 1.0, Some(day(2024, 6, 1)), now()).await.unwrap();
        assert_eq!(left, 2.0);

        let holdings = store.get_holdings(user).await.unwrap();
        let amount_of = |id: Uuid| holdings.iter().find(|h| h.id == id).map(|h| h.amount);
        assert_eq!(amount_of(march.id), Some(2.0));
        assert_eq!(amount_of(january.id), Some(0.0));
        let closed = holdings.iter().find(|h| h.id == january.id).unwrap();
        assert_eq!(closed.disposal_date, Some(day(2024, 6, 1)));
    }

    #[tokio::test]
    async fn test_sell_rejects_overselling_and_early_dates() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store
            .put_holdings(user, &[Holding::new("TSLA", 2.0, 200.0, day(2024, 3, 1))])
            .await
            .unwrap();

        let too_many = sell_position(&store, user, "TSLA", 3.0, None, now()).await;
        assert!(matches!(too_many, Err(AppError::Validation(_))));

        let too_early = sell_position(&store, user, "TSLA", 1.0, Some(day(2024, 2, 1)), now()).await;
        assert!(matches!(too_early, Err(AppError::Validation(_))));

        let unknown = sell_position(&store, user, "GME", 1.0, None, now()).await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));

        assert_eq!(store.get_holdings(user).await.unwrap()[0].amount, 2.0);
    }

    #[tokio::test]
    async fn test_tickers_are_distinct_and_active_only() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut closed = Holding::new("GME", 1.0, 20.0, day(2024, 1, 2));
        closed.amount = 0.0;
        closed.disposal_date = Some(day(2024, 2, 2));
        store
            .put_holdings(
                user,
                &[
                    Holding::new("TSLA", 1.0, 200.0, day(2024, 1, 2)),
                    closed,
                    Holding::new("AAPL", 1.0, 150.0, day(2024, 1, 3)),
                    Holding::new("TSLA", 2.0, 210.0, day(2024, 1, 4)),
                ],
            )
            .await
            .unwrap();

        assert_eq!(list_tickers(&store, user).await.unwrap(), vec!["TSLA".to_string(), "AAPL".to_string()]);
        assert!(list_tickers(&store, Uuid::new_v4()).await.unwrap().is_empty());
    }
}
