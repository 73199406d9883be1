use common::metrics;
use domain::Order;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use storage::OrderRepository;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::CacheError;

const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// Longest TTL honoured; larger values would overflow `Instant` arithmetic
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Expiry policy for the order cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    /// How many of the most recent orders are loaded on warm-up
    pub warm_limit: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            warm_limit: 100,
        }
    }
}

struct CacheEntry {
    order: Arc<Order>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// In-process TTL cache of order aggregates keyed by order uid.
///
/// Expired entries are hidden from reads immediately but stay in memory until
/// the next sweep removes them.
pub struct OrderCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: CacheConfig,
}

impl OrderCache {
    pub fn new(mut config: CacheConfig) -> Self {
        if config.ttl > MAX_TTL {
            warn!(
                "Cache TTL of {} seconds exceeds the maximum, using {} seconds",
                config.ttl.as_secs(),
                MAX_TTL.as_secs()
            );
            config.ttl = MAX_TTL;
        }
        info!(
            "Order cache initialized with TTL: {} seconds",
            config.ttl.as_secs()
        );
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Insert or replace an entry, resetting its expiry to `now + ttl`
    pub async fn set(&self, order_uid: &str, order: Arc<Order>) {
        let expires_at = Instant::now() + self.config.ttl;

        let mut entries = self.entries.write().await;
        entries.insert(order_uid.to_string(), CacheEntry { order, expires_at });
        metrics::CACHE_ENTRIES.set(entries.len() as i64);

        debug!("Cached order {}", order_uid);
    }

    /// Look up a live entry. A stale entry reads as absent but is left for the sweep.
    pub async fn get(&self, order_uid: &str) -> Option<Arc<Order>> {
        let now = Instant::now();
        let entries = self.entries.read().await;

        let order = entries
            .get(order_uid)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| Arc::clone(&entry.order));

        metrics::record_cache_request(order.is_some());
        order
    }

    /// Every entry that has not expired yet
    pub async fn snapshot(&self) -> HashMap<String, Arc<Order>> {
        let now = Instant::now();
        let entries = self.entries.read().await;

        entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(uid, entry)| (uid.clone(), Arc::clone(&entry.order)))
            .collect()
    }

    /// Number of stored entries, including expired ones not yet swept
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// One sweep pass. Returns how many entries were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();

        metrics::record_cache_sweep(entries.len(), removed);
        if removed > 0 {
            debug!("Cache sweep removed {} expired orders", removed);
        }

        removed
    }

    /// Seed the cache with the most recently created orders
    pub async fn warm(&self, repository: &dyn OrderRepository) -> Result<usize, CacheError> {
        let orders = repository.list_recent(self.config.warm_limit).await?;

        if orders.is_empty() {
            warn!("No orders found for cache initialization");
            return Ok(0);
        }

        let count = orders.len();
        for order in orders {
            let order = Arc::new(order);
            self.set(&order.order_uid, Arc::clone(&order)).await;
        }

        info!(count, "Successfully got orders for cache");
        Ok(count)
    }

    /// Sweep expired entries every `ttl / 2` until shutdown is signalled
    /// or the sender side goes away.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = (self.config.ttl / 2).max(MIN_SWEEP_PERIOD);
        let mut sweep = interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Cache sweep started with period: {:?}", period);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Cache sweep shutting down");
                        break;
                    }
                }
                _ = sweep.tick() => {
                    self.purge_expired().await;
                }
            }
        }
    }
}
