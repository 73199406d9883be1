pub mod order_cache;

pub use order_cache::{CacheConfig, OrderCache};

use storage::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to load orders for cache warm-up: {0}")]
    Warmup(#[from] RepositoryError),
}
