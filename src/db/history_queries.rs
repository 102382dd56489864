use sqlx::PgPool;
use uuid::Uuid;

use crate::models::HistorySnapshot;

pub async fn insert(pool: &PgPool, user_id: Uuid, snapshot: &HistorySnapshot) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO portfolio_history (user_id, recorded_at, total_value)
         VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(snapshot.timestamp)
    .bind(snapshot.total_value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_all(pool: &PgPool, user_id: Uuid) -> Result<Vec<HistorySnapshot>, sqlx::Error> {
    sqlx::query_as::<_, HistorySnapshot>(
        r#"
        SELECT recorded_at AS "timestamp", total_value
        FROM portfolio_history
        WHERE user_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
