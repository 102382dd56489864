use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::{error, info};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::DashboardSummary;
use crate::services::valuation_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_dashboard))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DashboardSummary>, AppError> {
    info!("GET /api/dashboard - Building dashboard for user {}", user_id);
    let summary = valuation_service::dashboard(
        state.store.as_ref(),
        state.price_provider.as_ref(),
        &state.valuation,
        user_id,
        Utc::now(),
    )
    .await
    .map_err(|e| {
        error!("Failed to build dashboard for user {}: {}", user_id, e);
        e
    })?;
    Ok(Json(summary))
}
