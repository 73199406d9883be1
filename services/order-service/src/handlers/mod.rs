pub mod get_order;
pub mod health;

use serde::Serialize;

/// `{"message": ...}` body used by every non-order response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
