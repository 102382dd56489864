use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{HistorySnapshot, Holding, Notification};
use crate::store::{PortfolioStore, StoreError};

#[derive(Debug, Default)]
struct PortfolioRecord {
    holdings: Vec<Holding>,
    history: Vec<HistorySnapshot>,
}

/// In-process store for local runs (`STORE_BACKEND=memory`) and tests.
#[derive(Default)]
pub struct MemoryStore {
    portfolios: RwLock<HashMap<Uuid, PortfolioRecord>>,
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn get_holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, StoreError> {
        let portfolios = self.portfolios.read().await;
        Ok(portfolios
            .get(&user_id)
            .map(|p| p.holdings.clone())
            .unwrap_or_default())
    }

    async fn put_holdings(&self, user_id: Uuid, holdings: &[Holding]) -> Result<(), StoreError> {
        let mut portfolios = self.portfolios.write().await;
        let record = portfolios.entry(user_id).or_default();

        for holding in holdings {
            match record.holdings.iter_mut().find(|h| h.id == holding.id) {
                Some(existing) => *existing = holding.clone(),
                None => record.holdings.push(holding.clone()),
            }
        }
        debug!("Stored {} holdings for user {}", record.holdings.len(), user_id);
        Ok(())
    }

    async fn portfolio_exists(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.portfolios.read().await.contains_key(&user_id))
    }

    async fn append_history(&self, user_id: Uuid, snapshot: HistorySnapshot) -> Result<(), StoreError> {
        let mut portfolios = self.portfolios.write().await;
        let record = portfolios
            .get_mut(&user_id)
            .ok_or(StoreError::PortfolioNotFound(user_id))?;
        record.history.push(snapshot);
        Ok(())
    }

    async fn get_history(&self, user_id: Uuid) -> Result<Vec<HistorySnapshot>, StoreError> {
        let portfolios = self.portfolios.read().await;
        portfolios
            .get(&user_id)
            .map(|p| p.history.clone())
            .ok_or(StoreError::PortfolioNotFound(user_id))
    }

    async fn append_notification(&self, notification: Notification) -> Result<(), StoreError> {
        self.notifications.write().await.push(notification);
        Ok(())
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
        let mut found: Vec<Notification> = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn mark_notification_seen(&self, user_id: Uuid, notification_id: Uuid) -> Result<bool, StoreError> {
        let mut notifications = self.notifications.write().await;
        match notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        {
            Some(n) => {
                n.seen = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};

    #[tokio::test]
    async fn test_put_holdings_creates_portfolio_and_upserts_by_id() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        assert!(!store.portfolio_exists(user).await.unwrap());

        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut holding = Holding::new("AAPL", 2.0, 150.0, date);
        store.put_holdings(user, &[holding.clone()]).await.unwrap();
        assert!(store.portfolio_exists(user).await.unwrap());

        holding.amount = 1.0;
        store.put_holdings(user, &[holding.clone()]).await.unwrap();

        let stored = store.get_holdings(user).await.unwrap();
        assert_eq!(stored, vec![holding]);
    }

    #[tokio::test]
    async fn test_history_requires_existing_portfolio() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let snapshot = HistorySnapshot { timestamp: Utc::now(), total_value: 10.0 };

        assert!(matches!(
            store.append_history(user, snapshot).await,
            Err(StoreError::PortfolioNotFound(id)) if id == user
        ));
        assert!(store.get_history(user).await.is_err());
        assert!(store.get_holdings(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notifications_are_scoped_to_user_and_newest_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();

        let older = Notification::purchase(user, "AAPL", "older".into(), now - Duration::minutes(5));
        let newer = Notification::purchase(user, "MSFT", "newer".into(), now);
        let foreign = Notification::purchase(other, "TSLA", "foreign".into(), now);
        for n in [older.clone(), newer.clone(), foreign.clone()] {
            store.append_notification(n).await.unwrap();
        }

        let listed = store.list_notifications(user).await.unwrap();
        assert_eq!(listed.iter().map(|n| n.message.as_str()).collect::<Vec<_>>(), vec!["newer", "older"]);

        assert!(!store.mark_notification_seen(user, foreign.id).await.unwrap());
        assert!(store.mark_notification_seen(user, older.id).await.unwrap());
        let listed = store.list_notifications(user).await.unwrap();
        assert!(listed.iter().find(|n| n.id == older.id).unwrap().seen);
    }
}
