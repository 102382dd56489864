use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{NewsArticle, NewsQueryParams};
use crate::services::news_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_news))
}

pub async fn get_news(
    State(state): State<AppState>,
    Query(params): Query<NewsQueryParams>,
) -> Result<Json<Vec<NewsArticle>>, AppError> {
    info!("GET /api/news - Fetching news (query {:?}, user {:?})", params.query, params.user_id);
    let articles = news_service::fetch(state.store.as_ref(), state.news_provider.as_ref(), &params)
        .await
        .map_err(|e| {
            error!("Failed to fetch news: {}", e);
            e
        })?;
    Ok(Json(articles))
}
