use async_trait::async_trait;
use common::config::KafkaConfig;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// A message detached from the broker client, ready for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

/// Source of order messages with explicit acknowledgement.
///
/// `fetch` blocks until a message is available. A message is only
/// acknowledged through `commit`; anything fetched but never committed is
/// delivered again after a rebalance or restart.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch(&self) -> Result<InboundMessage, ConsumerError>;

    async fn commit(&self, message: &InboundMessage) -> Result<(), ConsumerError>;
}

#[async_trait]
impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    async fn fetch(&self) -> Result<InboundMessage, ConsumerError> {
        (**self).fetch().await
    }

    async fn commit(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        (**self).commit(message).await
    }
}

/// Kafka-backed message source with manual offset commits
pub struct KafkaMessageSource {
    consumer: StreamConsumer,
}

impl KafkaMessageSource {
    /// Create the consumer and subscribe to the orders topic
    pub fn new(config: &KafkaConfig) -> Result<Self, ConsumerError> {
        info!(
            "Creating Kafka consumer with group_id: {}, topic: {}",
            config.group_id, config.orders_topic
        );

        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &config.group_id)
            .set("bootstrap.servers", &config.brokers)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set(
                "session.timeout.ms",
                config.session_timeout.as_millis().to_string(),
            )
            .set(
                "max.poll.interval.ms",
                config.max_poll_interval.as_millis().to_string(),
            )
            .create()?;

        consumer.subscribe(&[config.orders_topic.as_str()])?;

        info!("Kafka consumer created successfully");
        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaMessageSource {
    async fn fetch(&self) -> Result<InboundMessage, ConsumerError> {
        let message = self.consumer.recv().await?;

        debug!(
            "Received message from topic: {}, partition: {}, offset: {}",
            message.topic(),
            message.partition(),
            message.offset()
        );

        Ok(InboundMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            // An empty body fails to decode downstream and is discarded there
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    async fn commit(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;

        self.consumer.commit(&offsets, CommitMode::Sync)?;

        debug!("Committed offset {} for {}", message.offset + 1, message);
        Ok(())
    }
}
