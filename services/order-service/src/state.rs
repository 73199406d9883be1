use ingestion::OrderService;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<OrderService>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }
}
