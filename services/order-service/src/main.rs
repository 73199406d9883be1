use anyhow::{anyhow, Result};
use futures_util::stream::StreamExt;
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use cache::{CacheConfig, OrderCache};
use common::config::{AppConfig, StorageBackend};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
use ingestion::{OrderConsumer, OrderService};
use messaging::{KafkaMessageSource, MessageSource};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::{MemoryOrderRepository, OrderRepository, PostgresOrderRepository};

mod app;
mod handlers;
mod routes;
mod state;

use app::{Component, Supervisor};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    init_telemetry(TelemetryConfig::from_env("order-service"))
        .map_err(|e| anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Starting order service...");
    tracing::info!("Configuration:");
    tracing::info!("  Storage backend: {:?}", config.storage_backend);
    tracing::info!("  Kafka brokers: {}", config.kafka.brokers);
    tracing::info!("  Orders topic: {}", config.kafka.orders_topic);
    tracing::info!("  Cache TTL: {} seconds", config.cache.ttl.as_secs());
    tracing::info!("  Port: {}", config.http.port);

    let repository = build_repository(&config).await?;

    let cache = Arc::new(OrderCache::new(CacheConfig {
        ttl: config.cache.ttl,
        warm_limit: config.cache.warm_limit,
    }));
    let service = Arc::new(OrderService::new(repository.clone(), cache.clone()));

    let source: Box<dyn MessageSource> = Box::new(KafkaMessageSource::new(&config.kafka)?);
    let consumer = Arc::new(OrderConsumer::new(
        source,
        service.clone(),
        config.kafka.orders_topic.clone(),
    ));

    let router = routes::create_router(AppState::new(service, config.http.request_timeout));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));

    let components = vec![
        Component::Cache { cache, repository },
        Component::Consumer(consumer),
        Component::Server { router, addr },
    ];

    // Setup signal handling
    let signals = Signals::new([SIGTERM, SIGINT])?;
    let signals_handle = signals.handle();

    let mut supervisor = Supervisor::start(components, config.shutdown.clone()).await?;
    let result = supervisor.wait(shutdown_signal(signals)).await;
    supervisor.shutdown().await;
    signals_handle.close();

    // Shutdown telemetry gracefully
    shutdown_telemetry();

    result.map_err(Into::into)
}

async fn build_repository(config: &AppConfig) -> Result<Arc<dyn OrderRepository>> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&config.database.url())
                .await?;
            tracing::info!("Database connected");

            let repository = PostgresOrderRepository::new(pool);
            if config.database.run_migrations {
                repository.run_migrations().await?;
                tracing::info!("Migrations applied");
            }
            Ok(Arc::new(repository))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory order storage; orders are lost on restart");
            Ok(Arc::new(MemoryOrderRepository::new()))
        }
    }
}

async fn shutdown_signal(mut signals: Signals) {
    while let Some(signal) = signals.next().await {
        match signal {
            SIGTERM | SIGINT => {
                tracing::info!("Received shutdown signal, stopping...");
                break;
            }
            _ => {}
        }
    }
}
