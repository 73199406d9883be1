pub mod errors;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod models;
pub mod payloads;
pub mod uid;

pub use errors::UidError;
pub use models::order::{Delivery, Item, Order, Payment};
pub use payloads::order_payload::{DeliveryPayload, ItemPayload, OrderPayload, PaymentPayload};
pub use uid::OrderUid;
