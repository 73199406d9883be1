use common::metrics::{self, MessageOutcome};
use domain::OrderPayload;
use messaging::{InboundMessage, MessageSource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, warn};
use validator::Validate;

use crate::errors::{CreateOutcome, ErrorKind};
use crate::service::OrderService;

const FETCH_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// What to do with a message once processing finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge the offset
    Commit,
    /// Leave the offset uncommitted so the broker hands it out again
    Redeliver,
}

/// Sequential consumer of the orders topic.
///
/// Messages are handled one at a time in delivery order. The offset is
/// committed unless persisting the order failed with an infrastructure error.
pub struct OrderConsumer<S: MessageSource> {
    source: S,
    service: Arc<OrderService>,
    topic: String,
    fetch_backoff: Duration,
}

impl<S: MessageSource> OrderConsumer<S> {
    pub fn new(source: S, service: Arc<OrderService>, topic: impl Into<String>) -> Self {
        Self {
            source,
            service,
            topic: topic.into(),
            fetch_backoff: FETCH_ERROR_BACKOFF,
        }
    }

    /// Delay before polling again after the source reported an error
    pub fn with_fetch_backoff(mut self, backoff: Duration) -> Self {
        self.fetch_backoff = backoff;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one message through topic check, decode, validation and persistence
    pub async fn process(&self, message: &InboundMessage) -> Disposition {
        let start = Instant::now();
        let (outcome, disposition) = self.handle(message).await;
        metrics::record_message(outcome, start.elapsed().as_secs_f64());
        disposition
    }

    async fn handle(&self, message: &InboundMessage) -> (MessageOutcome, Disposition) {
        if message.topic != self.topic {
            warn!(
                expected = %self.topic,
                record = %message,
                "Message from unexpected topic, skipping"
            );
            return (MessageOutcome::Discarded, Disposition::Commit);
        }

        let payload: OrderPayload = match serde_json::from_slice(&message.payload) {
            Ok(payload) => payload,
            Err(e) => {
                error!(record = %message, error = %e, "Failed to decode order payload");
                return (MessageOutcome::Discarded, Disposition::Commit);
            }
        };

        // Invalid payloads are still handed to persistence
        if let Err(e) = payload.validate() {
            warn!(
                order_uid = %payload.order_uid,
                record = %message,
                errors = %e,
                "Order payload failed validation"
            );
        }

        let order_uid = payload.order_uid.clone();
        match self.service.create_order(payload).await {
            Ok(CreateOutcome::Created) => (MessageOutcome::Persisted, Disposition::Commit),
            Ok(CreateOutcome::Duplicate) => (MessageOutcome::Duplicate, Disposition::Commit),
            Err(e) if e.kind() == ErrorKind::Infrastructure => {
                error!(
                    order_uid = %order_uid,
                    record = %message,
                    error = %e,
                    "Order not persisted, leaving offset uncommitted"
                );
                (MessageOutcome::Failed, Disposition::Redeliver)
            }
            Err(e) => {
                warn!(order_uid = %order_uid, record = %message, error = %e, "Order rejected");
                (MessageOutcome::Discarded, Disposition::Commit)
            }
        }
    }

    /// Consume until shutdown is signalled or the sender side goes away
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting order consumer for topic: {}", self.topic);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                fetched = self.source.fetch() => match fetched {
                    Ok(message) => {
                        if self.process(&message).await == Disposition::Commit {
                            if let Err(e) = self.source.commit(&message).await {
                                error!(record = %message, error = %e, "Failed to commit offset");
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to fetch message");
                        tokio::select! {
                            changed = shutdown.changed() => {
                                if changed.is_err() || *shutdown.borrow() {
                                    break;
                                }
                            }
                            _ = tokio::time::sleep(self.fetch_backoff) => {}
                        }
                    }
                },
            }
        }

        info!("Order consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cache::{CacheConfig, OrderCache};
    use domain::fixtures::{sample_order, sample_payload};
    use messaging::ConsumerError;
    use storage::{MockOrderRepository, RepositoryError, SqlxError};

    const UID: &str = "b563feb7b2b84b6ftest";

    /// Source that never yields; tests call `process` directly
    struct IdleSource;

    #[async_trait]
    impl MessageSource for IdleSource {
        async fn fetch(&self) -> Result<InboundMessage, ConsumerError> {
            std::future::pending().await
        }

        async fn commit(&self, _message: &InboundMessage) -> Result<(), ConsumerError> {
            Ok(())
        }
    }

    fn consumer(repository: MockOrderRepository) -> OrderConsumer<IdleSource> {
        let service = OrderService::new(
            Arc::new(repository),
            Arc::new(OrderCache::new(CacheConfig::default())),
        );
        OrderConsumer::new(IdleSource, Arc::new(service), "orders")
    }

    fn message(topic: &str, payload: Vec<u8>) -> InboundMessage {
        InboundMessage {
            topic: topic.to_string(),
            partition: 0,
            offset: 7,
            key: None,
            payload,
        }
    }

    fn order_json(order_uid: &str) -> Vec<u8> {
        serde_json::to_vec(&sample_payload(order_uid)).unwrap()
    }

    #[tokio::test]
    async fn test_wrong_topic_is_committed_without_persisting() {
        let mut repository = MockOrderRepository::new();
        repository.expect_create_order().never();

        let disposition = consumer(repository)
            .process(&message("payments", order_json(UID)))
            .await;
        assert_eq!(disposition, Disposition::Commit);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_committed() {
        let mut repository = MockOrderRepository::new();
        repository.expect_create_order().never();
        let consumer = consumer(repository);

        for body in [b"not json".to_vec(), Vec::new(), br#"{"sm_id":"x"}"#.to_vec()] {
            assert_eq!(consumer.process(&message("orders", body)).await, Disposition::Commit);
        }
    }

    #[tokio::test]
    async fn test_invalid_payload_is_still_persisted() {
        let mut repository = MockOrderRepository::new();
        repository
            .expect_create_order()
            .withf(|order| order.payment.currency == "usd")
            .times(1)
            .returning(|_| Ok(()));

        let mut payload = sample_payload(UID);
        payload.payment.currency = "usd".to_string();
        assert!(payload.validate().is_err());

        let disposition = consumer(repository)
            .process(&message("orders", serde_json::to_vec(&payload).unwrap()))
            .await;
        assert_eq!(disposition, Disposition::Commit);
    }

    #[tokio::test]
    async fn test_persisted_order_is_committed_and_cached() {
        let mut repository = MockOrderRepository::new();
        repository.expect_create_order().times(1).returning(|_| Ok(()));
        let consumer = consumer(repository);

        let disposition = consumer.process(&message("orders", order_json(UID))).await;

        assert_eq!(disposition, Disposition::Commit);
        let cached = consumer.service.cache().get(UID).await.unwrap();
        assert_eq!(*cached, sample_order(UID));
    }

    #[tokio::test]
    async fn test_duplicate_order_is_committed() {
        let mut repository = MockOrderRepository::new();
        repository
            .expect_create_order()
            .returning(|order| Err(RepositoryError::AlreadyExists(order.order_uid.clone())));

        let disposition = consumer(repository)
            .process(&message("orders", order_json(UID)))
            .await;
        assert_eq!(disposition, Disposition::Commit);
    }

    #[tokio::test]
    async fn test_infrastructure_failure_is_redelivered() {
        let mut repository = MockOrderRepository::new();
        repository
            .expect_create_order()
            .returning(|_| Err(RepositoryError::Database(SqlxError::PoolTimedOut)));
        let consumer = consumer(repository);

        let disposition = consumer.process(&message("orders", order_json(UID))).await;

        assert_eq!(disposition, Disposition::Redeliver);
        assert!(consumer.service.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown_signal() {
        let consumer = consumer(MockOrderRepository::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let run = consumer.run(shutdown_rx);
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .expect("consumer should stop");
    }
}
