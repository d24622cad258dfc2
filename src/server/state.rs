//! Shared handler state

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::dispatch::Dispatcher;
use crate::ingest::Ingestor;
use crate::registry::SubscriptionRegistry;
use crate::server::config::ServerConfig;
use crate::stats::HubMetrics;
use crate::store::EventStore;

/// State cloned into every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<SubscriptionRegistry>,
    pub store: Arc<dyn EventStore>,
    pub ingestor: Arc<Ingestor>,
    pub metrics: Arc<HubMetrics>,
    /// Limits open event streams when `max_connections` is set
    pub stream_permits: Option<Arc<Semaphore>>,
}

impl AppState {
    /// Wire the registry, dispatcher and ingestor over a store
    pub fn new(config: ServerConfig, store: Arc<dyn EventStore>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::with_config(config.registry_config()));
        let metrics = Arc::new(HubMetrics::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&metrics));
        let ingestor = Arc::new(Ingestor::new(
            Arc::clone(&store),
            dispatcher,
            Arc::clone(&metrics),
        ));

        let stream_permits = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            registry,
            store,
            ingestor,
            metrics,
            stream_permits,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store.name())
            .field("channels", &self.registry.channel_count())
            .finish()
    }
}
