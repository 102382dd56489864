use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{
    ChartPoint, PriceChange, PriceChangeQuery, PricePoint, QuoteSummary, SearchQuery, SeriesQuery, TickerDetails,
    TickerMatch,
};
use crate::services::market_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/popular", get(get_popular))
        .route("/search", get(search_tickers))
        .route("/:ticker/previous", get(get_previous_close))
        .route("/:ticker/price", get(get_price_change))
        .route("/:ticker/series", get(get_series))
        .route("/:ticker/info", get(get_ticker_info))
}

pub async fn get_popular(State(state): State<AppState>) -> Json<Vec<QuoteSummary>> {
    info!("GET /api/market/popular - Fetching popular quotes");
    Json(market_service::popular(state.price_provider.as_ref()).await)
}

pub async fn search_tickers(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<TickerMatch>>, AppError> {
    info!("GET /api/market/search - Searching tickers for {:?}", query.query);
    let matches = market_service::search(state.price_provider.as_ref(), query.query.as_deref())
        .await
        .map_err(|e| {
            error!("Ticker search failed: {}", e);
            e
        })?;
    Ok(Json(matches))
}

pub async fn get_previous_close(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<PricePoint>, AppError> {
    info!("GET /api/market/{}/previous - Fetching previous close", ticker);
    let point = market_service::previous_close(state.price_provider.as_ref(), &ticker)
        .await
        .map_err(|e| {
            error!("Failed to fetch previous close for {}: {}", ticker, e);
            e
        })?;
    Ok(Json(point))
}

pub async fn get_price_change(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<PriceChangeQuery>,
) -> Result<Json<PriceChange>, AppError> {
    info!("GET /api/market/{}/price - Comparing over {:?} days", ticker, query.compare);
    let change = market_service::price_change(state.price_provider.as_ref(), &ticker, query.compare, Utc::now())
        .await
        .map_err(|e| {
            error!("Failed to compute price change for {}: {}", ticker, e);
            e
        })?;
    Ok(Json(change))
}

pub async fn get_series(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<Vec<ChartPoint>>, AppError> {
    info!("GET /api/market/{}/series - Fetching chart from {:?}", ticker, query.from);
    let points = market_service::series(
        state.price_provider.as_ref(),
        &ticker,
        query.from.as_deref(),
        query.timespan.as_deref(),
        Utc::now(),
    )
    .await
    .map_err(|e| {
        error!("Failed to fetch series for {}: {}", ticker, e);
        e
    })?;
    Ok(Json(points))
}

pub async fn get_ticker_info(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<TickerDetails>, AppError> {
    info!("GET /api/market/{}/info - Fetching ticker details", ticker);
    let details = market_service::details(state.price_provider.as_ref(), &ticker)
        .await
        .map_err(|e| {
            error!("Failed to fetch details for {}: {}", ticker, e);
            e
        })?;
    Ok(Json(details))
}
