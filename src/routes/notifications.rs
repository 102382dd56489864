use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{MarkSeenRequest, MarkSeenResponse, Notification, UserQuery};
use crate::services::{holding_service, notification_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_notifications).post(mark_seen))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    info!("GET /api/notifications - Listing notifications for {:?}", query.user_id);
    let user_id = holding_service::parse_user_id(query.user_id.as_deref())?;
    let notifications = notification_service::list(state.store.as_ref(), user_id)
        .await
        .map_err(|e| {
            error!("Failed to list notifications for user {}: {}", user_id, e);
            e
        })?;
    Ok(Json(notifications))
}

pub async fn mark_seen(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(data): Json<MarkSeenRequest>,
) -> Result<Json<MarkSeenResponse>, AppError> {
    info!("POST /api/notifications - Marking {:?} as seen", data.notification_id);
    let user_id = holding_service::parse_user_id(query.user_id.as_deref())?;
    let notification_id = data
        .notification_id
        .as_deref()
        .ok_or_else(|| AppError::Validation("notificationId is required".into()))
        .and_then(|raw| {
            Uuid::parse_str(raw.trim())
                .map_err(|_| AppError::Validation(format!("Invalid notificationId: {}", raw)))
        })?;

    notification_service::mark_seen(state.store.as_ref(), user_id, notification_id)
        .await
        .map_err(|e| {
            error!("Failed to mark notification {} as seen: {}", notification_id, e);
            e
        })?;
    Ok(Json(MarkSeenResponse { success: true }))
}
