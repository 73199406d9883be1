use super::{OrderRepository, RepositoryError};
use async_trait::async_trait;
use domain::Order;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process order repository with the same semantics as the PostgreSQL one.
///
/// Used for local runs without a database and by tests.
#[derive(Default)]
pub struct MemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn get_order(&self, order_uid: &str) -> Result<Order, RepositoryError> {
        self.orders
            .read()
            .await
            .get(order_uid)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(order_uid.to_string()))
    }

    async fn create_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;

        if orders.contains_key(&order.order_uid) {
            return Err(RepositoryError::AlreadyExists(order.order_uid.clone()));
        }

        orders.insert(order.order_uid.clone(), order.clone());
        debug!("Stored order {} in memory", order.order_uid);

        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;

        let mut recent: Vec<Order> = orders.values().cloned().collect();
        recent.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        recent.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::fixtures::{sample_order, sample_order_created_at};

    #[tokio::test]
    async fn test_create_then_get() {
        let repository = MemoryOrderRepository::new();
        let order = sample_order("b563feb7b2b84b6ftest");

        repository.create_order(&order).await.unwrap();

        let loaded = repository.get_order("b563feb7b2b84b6ftest").await.unwrap();
        assert_eq!(loaded, order);
    }

    #[tokio::test]
    async fn test_duplicate_create_keeps_first_aggregate() {
        let repository = MemoryOrderRepository::new();
        let first = sample_order("b563feb7b2b84b6ftest");
        let mut second = first.clone();
        second.track_number = "CHANGED".to_string();

        repository.create_order(&first).await.unwrap();
        let result = repository.create_order(&second).await;

        assert!(matches!(result, Err(RepositoryError::AlreadyExists(uid)) if uid == first.order_uid));
        let stored = repository.get_order(&first.order_uid).await.unwrap();
        assert_eq!(stored.track_number, "WBILMTESTTRACK");
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let repository = MemoryOrderRepository::new();

        let result = repository.get_order("0000000000000000test").await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_recent_is_newest_first_and_bounded() {
        let repository = MemoryOrderRepository::new();
        for (i, uid) in ["aaaaaaaaaaaaaaaatest", "bbbbbbbbbbbbbbbbtest", "cccccccccccccccctest"]
            .iter()
            .enumerate()
        {
            let order = sample_order_created_at(uid, 1_700_000_000 + i as i64);
            repository.create_order(&order).await.unwrap();
        }

        let recent = repository.list_recent(2).await.unwrap();
        let uids: Vec<&str> = recent.iter().map(|o| o.order_uid.as_str()).collect();
        assert_eq!(uids, vec!["cccccccccccccccctest", "bbbbbbbbbbbbbbbbtest"]);

        assert!(repository.list_recent(0).await.unwrap().is_empty());
        assert_eq!(repository.list_recent(100).await.unwrap().len(), 3);
    }
}
