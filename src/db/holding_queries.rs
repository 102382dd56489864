use sqlx::PgPool;
use uuid::Uuid;

use crate::db::portfolio_queries;
use crate::models::Holding;

pub async fn fetch_all(pool: &PgPool, user_id: Uuid) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(
        "SELECT id, ticker, amount, acquisition_price, acquisition_date, disposal_date
         FROM holdings
         WHERE user_id = $1
         ORDER BY ledger_position ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Upserts holdings by id inside one transaction. `ledger_position` keeps the
/// insertion order stable across updates.
pub async fn upsert_all(pool: &PgPool, user_id: Uuid, holdings: &[Holding]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    portfolio_queries::ensure(&mut *tx, user_id).await?;

    for h in holdings {
        sqlx::query(
            "INSERT INTO holdings (id, user_id, ticker, amount, acquisition_price, acquisition_date, disposal_date, ledger_position)
             VALUES ($1, $2, $3, $4, $5, $6, $7,
                     (SELECT COALESCE(MAX(ledger_position), 0) + 1 FROM holdings WHERE user_id = $2))
             ON CONFLICT (id) DO UPDATE
             SET amount = EXCLUDED.amount,
                 disposal_date = EXCLUDED.disposal_date",
        )
        .bind(h.id)
        .bind(user_id)
        .bind(&h.ticker)
        .bind(h.amount)
        .bind(h.acquisition_price)
        .bind(h.acquisition_date)
        .bind(h.disposal_date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
