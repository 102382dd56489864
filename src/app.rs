use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{dashboard, health, market, news, notifications, portfolio};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/dashboard", dashboard::router())
        .nest("/api/portfolio", portfolio::router())
        .nest("/api/notifications", notifications::router())
        .nest("/api/market", market::router())
        .nest("/api/news", news::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
