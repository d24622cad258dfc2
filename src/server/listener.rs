//! HTTP server listener
//!
//! Binds the router to a TCP listener, runs the expired-event sweep and
//! detaches every subscriber on shutdown so open event streams end.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::error::Result;
use crate::registry::SubscriptionRegistry;
use crate::server::config::{ServerConfig, MIN_INTERVAL};
use crate::server::routes::build_router;
use crate::server::state::AppState;
use crate::store::{EventStore, JournalEventStore, MemoryEventStore};

/// Webhook fan-out server
pub struct HookServer {
    state: AppState,
}

impl HookServer {
    /// Create a server over an existing store
    pub fn new(config: ServerConfig, store: Arc<dyn EventStore>) -> Self {
        Self {
            state: AppState::new(config, store),
        }
    }

    /// Create a server, opening the store the configuration asks for
    pub async fn from_config(config: ServerConfig) -> Result<Self> {
        let store: Arc<dyn EventStore> = match &config.journal_path {
            Some(path) => Arc::new(JournalEventStore::open(path, config.retention).await?),
            None => Arc::new(MemoryEventStore::with_retention(config.retention)),
        };

        Ok(Self::new(config, store))
    }

    /// Get the shared handler state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the subscription registry
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.state.registry
    }

    /// Build the router served by this server
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            prefix = %self.state.config.normalized_prefix(),
            store = self.state.store.name(),
            "Webhook server listening"
        );

        let sweep_handle = self.spawn_sweep_task();
        let registry = Arc::clone(&self.state.registry);

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
                // Ends every open event stream so connections can drain
                registry.close_all();
            })
            .await;

        // Stop sweep task on shutdown
        sweep_handle.abort();

        result?;
        Ok(())
    }

    /// Spawn a background task that purges expired events
    pub fn spawn_sweep_task(&self) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.state.store);
        // Fields are public; re-apply the setter floor
        let interval = self.state.config.sweep_interval.max(MIN_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match store.purge_expired().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed = removed, "Expired events purged"),
                    Err(e) => tracing::warn!(error = %e, "Failed to purge expired events"),
                }
            }
        })
    }
}
