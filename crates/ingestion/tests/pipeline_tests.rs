use async_trait::async_trait;
use cache::{CacheConfig, OrderCache};
use domain::fixtures::sample_payload;
use domain::Order;
use ingestion::{OrderConsumer, OrderService};
use messaging::{ConsumerError, InboundMessage, MessageSource};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage::{MemoryOrderRepository, OrderRepository, RepositoryError, SqlxError};
use tokio::sync::watch;

/// Replays a fixed script of fetch results, then blocks forever
struct ScriptedSource {
    script: Mutex<VecDeque<Result<InboundMessage, ConsumerError>>>,
    committed: Mutex<Vec<i64>>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<InboundMessage, ConsumerError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            committed: Mutex::new(Vec::new()),
        }
    }

    fn committed(&self) -> Vec<i64> {
        self.committed.lock().unwrap().clone()
    }

    fn drained(&self) -> bool {
        self.script.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn fetch(&self) -> Result<InboundMessage, ConsumerError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn commit(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        self.committed.lock().unwrap().push(message.offset);
        Ok(())
    }
}

/// Memory repository whose first write fails like an unreachable database
struct FlakyRepository {
    inner: MemoryOrderRepository,
    failed_once: AtomicBool,
}

#[async_trait]
impl OrderRepository for FlakyRepository {
    async fn get_order(&self, order_uid: &str) -> Result<Order, RepositoryError> {
        self.inner.get_order(order_uid).await
    }

    async fn create_order(&self, order: &Order) -> Result<(), RepositoryError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(RepositoryError::Database(SqlxError::PoolTimedOut));
        }
        self.inner.create_order(order).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        self.inner.list_recent(limit).await
    }
}

fn message(topic: &str, offset: i64, payload: Vec<u8>) -> Result<InboundMessage, ConsumerError> {
    Ok(InboundMessage {
        topic: topic.to_string(),
        partition: 0,
        offset,
        key: None,
        payload,
    })
}

fn order_json(order_uid: &str) -> Vec<u8> {
    serde_json::to_vec(&sample_payload(order_uid)).unwrap()
}

async fn run_until_drained(
    consumer: Arc<OrderConsumer<ScriptedSource>>,
    expected_commits: usize,
) -> Vec<i64> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run(shutdown_rx).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while !consumer.source().drained() || consumer.source().committed().len() < expected_commits
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("consumer should work through the script");

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();

    consumer.source().committed()
}

#[tokio::test]
async fn test_pipeline_persists_caches_and_commits() {
    let repository = Arc::new(MemoryOrderRepository::new());
    let cache = Arc::new(OrderCache::new(CacheConfig::default()));
    let service = Arc::new(OrderService::new(repository.clone(), cache.clone()));

    let source = ScriptedSource::new(vec![
        message("orders", 0, order_json("aaaaaaaaaaaaaaaatest")),
        message("orders", 1, b"{ broken".to_vec()),
        Err(ConsumerError::Kafka(KafkaError::MessageConsumption(
            RDKafkaErrorCode::BrokerTransportFailure,
        ))),
        message("orders", 2, order_json("aaaaaaaaaaaaaaaatest")),
        message("payments", 3, order_json("cccccccccccccccctest")),
        message("orders", 4, order_json("bbbbbbbbbbbbbbbbtest")),
    ]);
    let consumer = Arc::new(
        OrderConsumer::new(source, service.clone(), "orders")
            .with_fetch_backoff(Duration::from_millis(10)),
    );

    let committed = run_until_drained(consumer, 5).await;

    assert_eq!(committed, vec![0, 1, 2, 3, 4]);
    assert_eq!(repository.len().await, 2);
    assert!(cache.get("aaaaaaaaaaaaaaaatest").await.is_some());
    assert!(cache.get("bbbbbbbbbbbbbbbbtest").await.is_some());
    assert!(cache.get("cccccccccccccccctest").await.is_none());

    let order = service.get_by_id("bbbbbbbbbbbbbbbbtest").await.unwrap();
    assert_eq!(order.delivery.email, "test@gmail.com");
}

#[tokio::test]
async fn test_failed_persistence_is_not_committed() {
    let repository = Arc::new(FlakyRepository {
        inner: MemoryOrderRepository::new(),
        failed_once: AtomicBool::new(false),
    });
    let cache = Arc::new(OrderCache::new(CacheConfig::default()));
    let service = Arc::new(OrderService::new(repository.clone(), cache.clone()));

    let source = ScriptedSource::new(vec![
        message("orders", 10, order_json("aaaaaaaaaaaaaaaatest")),
        // Redelivery of the same record after restart
        message("orders", 10, order_json("aaaaaaaaaaaaaaaatest")),
    ]);
    let consumer = Arc::new(OrderConsumer::new(source, service, "orders"));

    let committed = run_until_drained(consumer, 1).await;

    assert_eq!(committed, vec![10]);
    assert_eq!(repository.inner.len().await, 1);
    assert!(cache.get("aaaaaaaaaaaaaaaatest").await.is_some());
}
