use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Notification;
use crate::store::PortfolioStore;

// ==============================================================================
// Notification Service
// ==============================================================================

/// Records an unseen purchase notification for a newly added position.
pub async fn record_purchase(
    store: &dyn PortfolioStore,
    user_id: Uuid,
    ticker: &str,
    amount: f64,
    price: f64,
    now: DateTime<Utc>,
) -> Result<Notification, AppError> {
    let message = format!("Bought {} shares of {} at ${:.2}", amount, ticker, price);
    let notification = Notification::purchase(user_id, ticker, message, now);

    store.append_notification(notification.clone()).await?;
    info!("Recorded purchase notification {} for user {}", notification.id, user_id);

    Ok(notification)
}

/// All notifications for a user, newest first.
pub async fn list(store: &dyn PortfolioStore, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
    Ok(store.list_notifications(user_id).await?)
}

pub async fn mark_seen(store: &dyn PortfolioStore, user_id: Uuid, notification_id: Uuid) -> Result<(), AppError> {
    if store.mark_notification_seen(user_id, notification_id).await? {
        return Ok(());
    }

    warn!("User {} has no notification {}", user_id, notification_id);
    Err(AppError::NotFound(format!("Notification {} not found", notification_id)))
}
