pub mod consumer;
pub mod errors;
pub mod service;

pub use consumer::{Disposition, OrderConsumer};
pub use errors::{CreateOutcome, ErrorKind, OrderServiceError};
pub use service::OrderService;
