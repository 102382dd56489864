use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::external::price_provider::{Granularity, PriceProvider};
use crate::models::{Holding, PositionValuation};

/// How a holding's current price lookup ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceOutcome {
    Priced(f64),
    NoData,
    Failed(String),
}

/// Resolves the price a holding is worth right now.
///
/// A holding bought today is priced from the latest close; older holdings use
/// the daily series anchored at the acquisition date and take its last close.
pub async fn resolve_current_price(
    provider: &dyn PriceProvider,
    holding: &Holding,
    now: DateTime<Utc>,
) -> PriceOutcome {
    let today = now.date_naive();

    if holding.acquisition_date == today {
        return match provider.latest_close(&holding.ticker).await {
            Ok(Some(point)) => PriceOutcome::Priced(point.close),
            Ok(None) => PriceOutcome::NoData,
            Err(e) => PriceOutcome::Failed(e.to_string()),
        };
    }

    match provider
        .price_series(&holding.ticker, holding.acquisition_date, today, Granularity::Day)
        .await
    {
        Ok(points) => match points.last() {
            Some(point) => PriceOutcome::Priced(point.close),
            None => PriceOutcome::NoData,
        },
        Err(e) => PriceOutcome::Failed(e.to_string()),
    }
}

/// Close from roughly 24 hours ago, or `None` when the daily series over the
/// last day has fewer than two points or the lookup fails.
pub async fn resolve_price_24h_ago(provider: &dyn PriceProvider, ticker: &str, now: DateTime<Utc>) -> Option<f64> {
    let from = (now - Duration::hours(24)).date_naive();
    let to = now.date_naive();

    match provider.price_series(ticker, from, to, Granularity::Day).await {
        Ok(points) if points.len() >= 2 => points.first().map(|p| p.close),
        Ok(points) => {
            debug!("Only {} daily points for {} in the last 24h", points.len(), ticker);
            None
        }
        Err(e) => {
            warn!("24h price lookup failed for {}: {}", ticker, e);
            None
        }
    }
}

/// Percent change from `previous` to `current`; 0 when `previous` is not positive.
pub fn change_percent(current: f64, previous: f64) -> f64 {
    if previous <= 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Value 24h ago, back-computed from the current price and percent change.
pub fn value_24h_ago(current_price: f64, change_percent: f64, amount: f64) -> f64 {
    let factor = 1.0 + change_percent / 100.0;
    if factor <= 0.0 {
        return 0.0;
    }
    current_price / factor * amount
}

/// Prices one holding. Never fails: an unresolvable price yields a zero
/// contribution so one bad ticker cannot blank the whole portfolio.
pub async fn price_position(provider: &dyn PriceProvider, holding: &Holding, now: DateTime<Utc>) -> PositionValuation {
    let current_price = match resolve_current_price(provider, holding, now).await {
        PriceOutcome::Priced(price) => price,
        PriceOutcome::NoData => {
            warn!("No price data for {}, valuing position at zero", holding.ticker);
            return PositionValuation::unpriced(&holding.ticker, holding.amount);
        }
        PriceOutcome::Failed(reason) => {
            warn!("Price unavailable for {} ({}), valuing position at zero", holding.ticker, reason);
            return PositionValuation::unpriced(&holding.ticker, holding.amount);
        }
    };

    let price_24h_ago = resolve_price_24h_ago(provider, &holding.ticker, now)
        .await
        .unwrap_or(current_price);
    let change = change_percent(current_price, price_24h_ago);

    PositionValuation {
        ticker: holding.ticker.clone(),
        amount: holding.amount,
        current_price,
        change_percent: change,
        market_value: current_price * holding.amount,
        value_24h_ago: value_24h_ago(current_price, change, holding.amount),
        price_available: true,
    }
}
