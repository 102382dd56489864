use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::Notification;

// ==============================================================================
// Notification Operations
// ==============================================================================

#[derive(Debug, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub related_ticker: Option<String>,
    pub created_at: DateTime<Utc>,
    pub seen: bool,
}

pub async fn insert(pool: &PgPool, notification: &Notification) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, kind, message, related_ticker, created_at, seen)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(notification.id)
    .bind(notification.user_id)
    .bind(notification.kind.as_str())
    .bind(&notification.message)
    .bind(&notification.related_ticker)
    .bind(notification.created_at)
    .bind(notification.seen)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<NotificationRow>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRow>(
        r#"
        SELECT id, user_id, kind, message, related_ticker, created_at, seen
        FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn mark_seen(pool: &PgPool, user_id: Uuid, notification_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET seen = TRUE
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(notification_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
