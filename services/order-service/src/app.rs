use axum::Router;
use cache::{CacheError, OrderCache};
use common::config::ShutdownConfig;
use futures_util::FutureExt;
use ingestion::OrderConsumer;
use messaging::MessageSource;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use storage::OrderRepository;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cache start-up failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Server(std::io::Error),

    #[error("Component {0} panicked")]
    Panicked(&'static str),
}

/// The long-running parts of the service, started in declaration order
pub enum Component {
    Cache {
        cache: Arc<OrderCache>,
        repository: Arc<dyn OrderRepository>,
    },
    Consumer(Arc<OrderConsumer<Box<dyn MessageSource>>>),
    Server {
        router: Router,
        addr: SocketAddr,
    },
}

struct ComponentExit {
    name: &'static str,
    result: Result<(), AppError>,
}

/// A started component: its stop signal and its task
pub struct RunningComponent {
    name: &'static str,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Component {
    pub fn name(&self) -> &'static str {
        match self {
            Component::Cache { .. } => "cache",
            Component::Consumer(_) => "consumer",
            Component::Server { .. } => "server",
        }
    }

    async fn start(
        self,
        exits: mpsc::UnboundedSender<ComponentExit>,
    ) -> Result<RunningComponent, AppError> {
        let name = self.name();
        let (stop, stopped) = watch::channel(false);

        let handle = match self {
            Component::Cache { cache, repository } => {
                // Serving must not begin on a cold cache
                cache.warm(repository.as_ref()).await?;
                spawn(name, exits, async move {
                    cache.run(stopped).await;
                    Ok(())
                })
            }
            Component::Consumer(consumer) => spawn(name, exits, async move {
                consumer.run(stopped).await;
                Ok(())
            }),
            Component::Server { router, addr } => {
                let listener = tokio::net::TcpListener::bind(addr)
                    .await
                    .map_err(|source| AppError::Bind { addr, source })?;
                info!("Order service listening on {}", addr);

                spawn(name, exits, async move {
                    axum::serve(listener, router)
                        .with_graceful_shutdown(wait_for_stop(stopped))
                        .await
                        .map_err(AppError::Server)
                })
            }
        };

        info!("Component {} started", name);
        Ok(RunningComponent { name, stop, handle })
    }
}

fn spawn<F>(
    name: &'static str,
    exits: mpsc::UnboundedSender<ComponentExit>,
    task: F,
) -> JoinHandle<()>
where
    F: Future<Output = Result<(), AppError>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = match AssertUnwindSafe(task).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(AppError::Panicked(name)),
        };
        let _ = exits.send(ComponentExit { name, result });
    })
}

async fn wait_for_stop(mut stopped: watch::Receiver<bool>) {
    while !*stopped.borrow() {
        if stopped.changed().await.is_err() {
            break;
        }
    }
}

/// Starts components in order and stops them in reverse order.
pub struct Supervisor {
    running: Vec<RunningComponent>,
    exits: mpsc::UnboundedReceiver<ComponentExit>,
    config: ShutdownConfig,
}

impl Supervisor {
    /// Start every component. If one fails, the ones already running are
    /// shut down before the error is returned.
    pub async fn start(
        components: Vec<Component>,
        config: ShutdownConfig,
    ) -> Result<Self, AppError> {
        let (exits_tx, exits) = mpsc::unbounded_channel();
        let mut supervisor = Self {
            running: Vec::with_capacity(components.len()),
            exits,
            config,
        };

        for component in components {
            let name = component.name();
            match component.start(exits_tx.clone()).await {
                Ok(running) => supervisor.running.push(running),
                Err(e) => {
                    error!("Failed to start component {}: {}", name, e);
                    supervisor.shutdown().await;
                    return Err(e);
                }
            }
        }

        Ok(supervisor)
    }

    /// Wait for the shutdown signal or for a component to fail.
    ///
    /// A component that stops cleanly on its own is logged and the wait
    /// continues.
    pub async fn wait<F>(&mut self, signal: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
                exit = self.exits.recv() => match exit {
                    Some(ComponentExit { name, result: Err(e) }) => {
                        error!("Component {} failed: {}", name, e);
                        return Err(e);
                    }
                    Some(ComponentExit { name, result: Ok(()) }) => {
                        warn!("Component {} stopped unexpectedly", name);
                    }
                    None => return Ok(()),
                },
            }
        }
    }

    /// Stop components in reverse start order within the configured budget.
    /// Components that miss their deadline are aborted.
    pub async fn shutdown(mut self) {
        let deadline = Instant::now() + self.config.total;

        while let Some(mut component) = self.running.pop() {
            let _ = component.stop.send(true);

            let remaining = deadline.saturating_duration_since(Instant::now());
            let budget = self.config.per_component.min(remaining);

            match tokio::time::timeout(budget, &mut component.handle).await {
                Ok(_) => info!("Component {} stopped", component.name),
                Err(_) => {
                    warn!(
                        "Component {} did not stop within {:?}, forced shutdown due to context timeout",
                        component.name, budget
                    );
                    component.handle.abort();
                }
            }
        }

        info!("Shutdown complete");
    }
}
