use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::notification_queries::NotificationRow;
use crate::db::{history_queries, holding_queries, notification_queries, portfolio_queries};
use crate::models::{HistorySnapshot, Holding, Notification};
use crate::store::{PortfolioStore, StoreError};

/// Postgres-backed store. Owns the connection pool for the process lifetime.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("✅ Connected to Postgres and applied migrations");

        Ok(Self { pool })
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse().map_err(StoreError::Corrupt)?;
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind,
            message: row.message,
            related_ticker: row.related_ticker,
            created_at: row.created_at,
            seen: row.seen,
        })
    }
}

#[async_trait]
impl PortfolioStore for PgStore {
    async fn get_holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, StoreError> {
        Ok(holding_queries::fetch_all(&self.pool, user_id).await?)
    }

    async fn put_holdings(&self, user_id: Uuid, holdings: &[Holding]) -> Result<(), StoreError> {
        holding_queries::upsert_all(&self.pool, user_id, holdings)
            .await
            .map_err(|e| {
                error!("Failed to store holdings for user {}: {}", user_id, e);
                StoreError::Db(e)
            })
    }

    async fn portfolio_exists(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(portfolio_queries::exists(&self.pool, user_id).await?)
    }

    async fn append_history(&self, user_id: Uuid, snapshot: HistorySnapshot) -> Result<(), StoreError> {
        if !portfolio_queries::exists(&self.pool, user_id).await? {
            return Err(StoreError::PortfolioNotFound(user_id));
        }
        history_queries::insert(&self.pool, user_id, &snapshot).await?;
        Ok(())
    }

    async fn get_history(&self, user_id: Uuid) -> Result<Vec<HistorySnapshot>, StoreError> {
        if !portfolio_queries::exists(&self.pool, user_id).await? {
            return Err(StoreError::PortfolioNotFound(user_id));
        }
        Ok(history_queries::fetch_all(&self.pool, user_id).await?)
    }

    async fn append_notification(&self, notification: Notification) -> Result<(), StoreError> {
        notification_queries::insert(&self.pool, &notification).await?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
        notification_queries::fetch_for_user(&self.pool, user_id)
            .await?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }

    async fn mark_notification_seen(&self, user_id: Uuid, notification_id: Uuid) -> Result<bool, StoreError> {
        let updated = notification_queries::mark_seen(&self.pool, user_id, notification_id).await?;
        Ok(updated > 0)
    }

    async fn close(&self) {
        info!("Closing Postgres pool");
        self.pool.close().await;
    }
}
