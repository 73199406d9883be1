use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounter, IntGauge, TextEncoder,
};

lazy_static! {
    // Ingestion metrics
    pub static ref MESSAGE_COUNTER: CounterVec = register_counter_vec!(
        "orders_messages_total",
        "Total number of order messages handled by the consumer",
        &["outcome"]
    )
    .expect("metric cannot be created");

    pub static ref MESSAGE_DURATION: HistogramVec = register_histogram_vec!(
        "orders_message_duration_seconds",
        "Order message processing duration in seconds",
        &["outcome"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("metric cannot be created");

    // Query metrics
    pub static ref QUERY_COUNTER: CounterVec = register_counter_vec!(
        "orders_queries_total",
        "Total number of order lookups",
        &["source", "status"]
    )
    .expect("metric cannot be created");

    pub static ref QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "orders_query_duration_seconds",
        "Order lookup duration in seconds",
        &["source"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]
    )
    .expect("metric cannot be created");

    // Cache metrics
    pub static ref CACHE_HIT_COUNTER: CounterVec = register_counter_vec!(
        "orders_cache_requests_total",
        "Total number of cache requests",
        &["status"]
    )
    .expect("metric cannot be created");

    pub static ref CACHE_ENTRIES: IntGauge = register_int_gauge!(
        "orders_cache_entries",
        "Number of entries held by the order cache, including expired ones not yet swept"
    )
    .expect("metric cannot be created");

    pub static ref CACHE_EVICTIONS: IntCounter = register_int_counter!(
        "orders_cache_evictions_total",
        "Total number of expired entries removed by the sweep"
    )
    .expect("metric cannot be created");

    // Repository metrics
    pub static ref REPOSITORY_OPERATIONS: CounterVec = register_counter_vec!(
        "orders_repository_operations_total",
        "Total number of order repository operations",
        &["operation", "status"]
    )
    .expect("metric cannot be created");
}

/// Outcome label for a processed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Persisted,
    Duplicate,
    Discarded,
    Failed,
}

impl MessageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageOutcome::Persisted => "persisted",
            MessageOutcome::Duplicate => "duplicate",
            MessageOutcome::Discarded => "discarded",
            MessageOutcome::Failed => "failed",
        }
    }
}

/// Get all metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Helper function to record one consumed message
pub fn record_message(outcome: MessageOutcome, duration_secs: f64) {
    MESSAGE_COUNTER.with_label_values(&[outcome.as_str()]).inc();
    MESSAGE_DURATION
        .with_label_values(&[outcome.as_str()])
        .observe(duration_secs);
}

/// Helper function to record an order lookup
pub fn record_query(source: &str, success: bool, duration_secs: f64) {
    let status = if success { "success" } else { "error" };
    QUERY_COUNTER.with_label_values(&[source, status]).inc();
    QUERY_DURATION
        .with_label_values(&[source])
        .observe(duration_secs);
}

/// Helper function to record cache hit/miss
pub fn record_cache_request(hit: bool) {
    let status = if hit { "hit" } else { "miss" };
    CACHE_HIT_COUNTER.with_label_values(&[status]).inc();
}

/// Helper function to record the cache size and sweep removals
pub fn record_cache_sweep(remaining: usize, evicted: usize) {
    CACHE_ENTRIES.set(remaining as i64);
    CACHE_EVICTIONS.inc_by(evicted as u64);
}

/// Helper function to record a repository call
pub fn record_repository_operation(operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    REPOSITORY_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_metrics_includes_recorded_series() {
        record_message(MessageOutcome::Persisted, 0.01);
        record_cache_request(true);
        record_cache_sweep(3, 1);
        record_query("cache", true, 0.0001);
        record_repository_operation("create_order", true);

        let text = gather_metrics().unwrap();
        assert!(text.contains("orders_messages_total"));
        assert!(text.contains("orders_cache_requests_total"));
        assert!(text.contains("orders_cache_evictions_total"));
        assert!(text.contains("orders_repository_operations_total"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(MessageOutcome::Duplicate.as_str(), "duplicate");
        assert_eq!(MessageOutcome::Discarded.as_str(), "discarded");
    }
}
