pub mod memory_order_repository;
pub mod postgres_order_repository;

pub use memory_order_repository::MemoryOrderRepository;
pub use postgres_order_repository::PostgresOrderRepository;
pub use sqlx::Error as SqlxError;

use async_trait::async_trait;
use domain::Order;
use thiserror::Error;

/// Durable store for order aggregates.
///
/// Every call is its own transaction boundary: an aggregate is written or
/// read as Order + Delivery + Payment + Items together, never partially.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Load a single aggregate by identifier
    async fn get_order(&self, order_uid: &str) -> Result<Order, RepositoryError>;

    /// Persist a new aggregate atomically.
    ///
    /// An existing identifier yields [`RepositoryError::AlreadyExists`] and
    /// leaves the stored aggregate untouched.
    async fn create_order(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Most recently created aggregates, newest first
    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError>;
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Whether retrying the same call could succeed
    pub fn is_retriable(&self) -> bool {
        matches!(self, RepositoryError::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_database_errors_are_retriable() {
        assert!(!RepositoryError::NotFound("x".into()).is_retriable());
        assert!(!RepositoryError::AlreadyExists("x".into()).is_retriable());
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_retriable());
    }
}
