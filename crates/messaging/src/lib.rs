pub mod consumer;

pub use consumer::{ConsumerError, InboundMessage, KafkaMessageSource, MessageSource};
