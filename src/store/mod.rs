pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{HistorySnapshot, Holding, Notification};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("portfolio not found for user {0}")]
    PortfolioNotFound(Uuid),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// System of record for portfolios, their value history and notifications.
///
/// One handle is built at startup and shared through `AppState`; conflicting
/// writes are serialized by the backing store.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Holdings in ledger order. Empty when the user has no portfolio yet.
    async fn get_holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, StoreError>;

    /// Upserts the given holdings by id, creating the portfolio on first write.
    async fn put_holdings(&self, user_id: Uuid, holdings: &[Holding]) -> Result<(), StoreError>;

    async fn portfolio_exists(&self, user_id: Uuid) -> Result<bool, StoreError>;

    /// Fails with `PortfolioNotFound` when the user has no portfolio.
    async fn append_history(&self, user_id: Uuid, snapshot: HistorySnapshot) -> Result<(), StoreError>;

    /// Snapshots in storage order. Fails with `PortfolioNotFound` when the
    /// user has no portfolio.
    async fn get_history(&self, user_id: Uuid) -> Result<Vec<HistorySnapshot>, StoreError>;

    async fn append_notification(&self, notification: Notification) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError>;

    /// Returns false when the user owns no notification with that id.
    async fn mark_notification_seen(&self, user_id: Uuid, notification_id: Uuid) -> Result<bool, StoreError>;

    async fn close(&self);
}
