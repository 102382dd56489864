use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveTime, Utc};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{
    AddPosition, AddPositionResponse, AppendSnapshot, HistoryPoint, HistoryQuery, PortfolioValuation, SellPosition,
    SellPositionResponse, UserTickers,
};
use crate::services::{history_service, holding_service, valuation_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_position))
        .route("/sell", post(sell_position))
        .route("/:user_id", get(get_portfolio))
        .route("/:user_id/tickers", get(get_tickers))
        .route("/:user_id/history", get(get_history).post(append_history))
        .route("/:user_id/history/snapshot", post(record_snapshot))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// History timestamps accept a bare date (midnight UTC) or RFC 3339.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(_) => holding_service::parse_date(raw).map(|d| d.and_time(NaiveTime::MIN).and_utc()),
    }
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PortfolioValuation>, AppError> {
    info!("GET /api/portfolio/{} - Valuing portfolio", user_id);
    let user_id = holding_service::parse_user_id(Some(&user_id))?;
    let valuation = valuation_service::fetch_portfolio(
        state.store.as_ref(),
        state.price_provider.as_ref(),
        &state.valuation,
        user_id,
        Utc::now(),
    )
    .await
    .map_err(|e| {
        error!("Failed to value portfolio for user {}: {}", user_id, e);
        e
    })?;
    Ok(Json(valuation))
}

pub async fn get_tickers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserTickers>, AppError> {
    info!("GET /api/portfolio/{}/tickers - Listing tickers", user_id);
    let user_id = holding_service::parse_user_id(Some(&user_id))?;
    let tickers = holding_service::list_tickers(state.store.as_ref(), user_id)
        .await
        .map_err(|e| {
            error!("Failed to list tickers for user {}: {}", user_id, e);
            e
        })?;
    Ok(Json(UserTickers { tickers }))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryPoint>>, AppError> {
    info!(
        "GET /api/portfolio/{}/history - Fetching history (filter {:?})",
        user_id, query.filter
    );
    let user_id = holding_service::parse_user_id(Some(&user_id))?;
    let history = history_service::get_history(state.store.as_ref(), user_id, query.filter.as_deref(), Utc::now())
        .await
        .map_err(|e| {
            error!("Failed to fetch history for user {}: {}", user_id, e);
            e
        })?;
    Ok(Json(history.into_iter().map(HistoryPoint::from).collect()))
}

pub async fn append_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(data): Json<AppendSnapshot>,
) -> Result<Json<HistoryPoint>, AppError> {
    info!("POST /api/portfolio/{}/history - Appending snapshot", user_id);
    let user_id = holding_service::parse_user_id(Some(&user_id))?;
    let value = required(data.value, "value")?;
    let timestamp = match data.date.as_deref() {
        Some(raw) => parse_timestamp(raw)?,
        None => Utc::now(),
    };

    let snapshot = history_service::append_snapshot(state.store.as_ref(), user_id, timestamp, value)
        .await
        .map_err(|e| {
            error!("Failed to append history for user {}: {}", user_id, e);
            e
        })?;
    Ok(Json(snapshot.into()))
}

pub async fn record_snapshot(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<HistoryPoint>, AppError> {
    info!("POST /api/portfolio/{}/history/snapshot - Recording current value", user_id);
    let user_id = holding_service::parse_user_id(Some(&user_id))?;
    let snapshot = history_service::record_current_value(
        state.store.as_ref(),
        state.price_provider.as_ref(),
        &state.valuation,
        user_id,
        Utc::now(),
    )
    .await
    .map_err(|e| {
        error!("Failed to record snapshot for user {}: {}", user_id, e);
        e
    })?;
    Ok(Json(snapshot.into()))
}

pub async fn add_position(
    State(state): State<AppState>,
    Json(data): Json<AddPosition>,
) -> Result<Json<AddPositionResponse>, AppError> {
    info!("POST /api/portfolio/add - Adding {:?} x {:?}", data.ticker, data.amount);
    let user_id = holding_service::parse_user_id(data.user_id.as_deref())?;
    let ticker = required(data.ticker, "ticker")?;
    let amount = required(data.amount, "amount")?;
    let date = data.date.as_deref().map(holding_service::parse_date).transpose()?;

    let (holding, _notification) = holding_service::add_position(
        state.store.as_ref(),
        state.price_provider.as_ref(),
        user_id,
        &ticker,
        amount,
        date,
        Utc::now(),
    )
    .await
    .map_err(|e| {
        error!("Failed to add {} for user {}: {}", ticker, user_id, e);
        e
    })?;

    Ok(Json(AddPositionResponse {
        message: format!("Added {} shares of {} to portfolio", holding.amount, holding.ticker),
        holding,
    }))
}

pub async fn sell_position(
    State(state): State<AppState>,
    Json(data): Json<SellPosition>,
) -> Result<Json<SellPositionResponse>, AppError> {
    info!("POST /api/portfolio/sell - Selling {:?} x {:?}", data.ticker, data.amount);
    let user_id = holding_service::parse_user_id(data.user_id.as_deref())?;
    let ticker = required(data.ticker, "ticker")?;
    let amount = required(data.amount, "amount")?;
    let date = data.date.as_deref().map(holding_service::parse_date).transpose()?;

    let remaining_amount = holding_service::sell_position(state.store.as_ref(), user_id, &ticker, amount, date, Utc::now())
        .await
        .map_err(|e| {
            error!("Failed to sell {} for user {}: {}", ticker, user_id, e);
            e
        })?;

    Ok(Json(SellPositionResponse {
        message: format!("Sold {} shares of {}", amount, ticker.trim().to_uppercase()),
        remaining_amount,
    }))
}
