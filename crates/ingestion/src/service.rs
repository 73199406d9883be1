use cache::OrderCache;
use common::metrics;
use domain::{Order, OrderPayload, OrderUid};
use std::sync::Arc;
use std::time::Instant;
use storage::{OrderRepository, RepositoryError};
use tracing::{debug, error, info};

use crate::errors::{CreateOutcome, OrderServiceError};

/// Order use cases shared by the consumer and the HTTP API.
///
/// Writes go to the repository first and reach the cache only once they are
/// durable. Reads go cache first, then repository.
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    cache: Arc<OrderCache>,
    backfill_on_miss: bool,
}

impl OrderService {
    pub fn new(repository: Arc<dyn OrderRepository>, cache: Arc<OrderCache>) -> Self {
        Self {
            repository,
            cache,
            backfill_on_miss: true,
        }
    }

    /// Whether a repository hit on a cache miss is written back to the cache
    pub fn with_backfill(mut self, enabled: bool) -> Self {
        self.backfill_on_miss = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<OrderCache> {
        &self.cache
    }

    /// Persist an inbound order, then cache it.
    ///
    /// An identifier that is already stored is reported as
    /// [`CreateOutcome::Duplicate`]; the stored aggregate and the cache are
    /// left as they were.
    pub async fn create_order(
        &self,
        payload: OrderPayload,
    ) -> Result<CreateOutcome, OrderServiceError> {
        let order = Order::from(payload);

        match self.repository.create_order(&order).await {
            Ok(()) => {
                metrics::record_repository_operation("create_order", true);

                let order = Arc::new(order);
                self.cache.set(&order.order_uid, Arc::clone(&order)).await;

                info!(order_uid = %order.order_uid, "Order saved");
                Ok(CreateOutcome::Created)
            }
            Err(RepositoryError::AlreadyExists(order_uid)) => {
                metrics::record_repository_operation("create_order", true);
                info!(order_uid = %order_uid, "Order already stored, skipping");
                Ok(CreateOutcome::Duplicate)
            }
            Err(e) => {
                metrics::record_repository_operation("create_order", false);
                error!(order_uid = %order.order_uid, error = %e, "Failed to save order");
                Err(OrderServiceError::Infrastructure(e))
            }
        }
    }

    /// Look up an order by identifier.
    ///
    /// A malformed identifier is rejected before the cache or repository is
    /// touched.
    pub async fn get_by_id(&self, order_uid: &str) -> Result<Arc<Order>, OrderServiceError> {
        OrderUid::validate(order_uid)?;

        let start = Instant::now();

        if let Some(order) = self.cache.get(order_uid).await {
            debug!("Cache hit for order: {}", order_uid);
            metrics::record_query("cache", true, start.elapsed().as_secs_f64());
            return Ok(order);
        }

        debug!("Cache miss for order: {}, querying repository", order_uid);

        let result = self.repository.get_order(order_uid).await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(order) => {
                metrics::record_repository_operation("get_order", true);
                metrics::record_query("repository", true, elapsed);

                let order = Arc::new(order);
                if self.backfill_on_miss {
                    self.cache.set(order_uid, Arc::clone(&order)).await;
                }
                Ok(order)
            }
            Err(RepositoryError::NotFound(_)) => {
                metrics::record_repository_operation("get_order", true);
                metrics::record_query("repository", false, elapsed);
                debug!("Order not found: {}", order_uid);
                Err(OrderServiceError::NotFound(order_uid.to_string()))
            }
            Err(e) => {
                metrics::record_repository_operation("get_order", false);
                metrics::record_query("repository", false, elapsed);
                error!(order_uid = %order_uid, error = %e, "Failed to fetch order");
                Err(e.into())
            }
        }
    }
}
