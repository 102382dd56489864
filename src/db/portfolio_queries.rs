use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

pub async fn exists(pool: &PgPool, user_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM portfolios WHERE user_id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Creates the user's portfolio row if it is missing.
pub async fn ensure<'e, E>(executor: E, user_id: Uuid) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO portfolios (user_id)
         VALUES ($1)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}
