//! Ingestion path
//!
//! Turns an inbound call into a persisted event and hands it to the
//! dispatcher. Persistence happens-before broadcast: an event that failed to
//! persist is never published, and a broadcast outcome is never reported to
//! the caller.
//!
//! Persist and publish for one channel run under a sequencing lock so that
//! concurrent calls on the same channel are broadcast in the order they were
//! persisted. Locks are striped by channel hash: unrelated channels rarely
//! share a stripe, and the lock table never grows.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::dispatch::{DispatchReport, Dispatcher};
use crate::event::{Event, Headers, NewEvent};
use crate::registry::ChannelId;
use crate::stats::HubMetrics;
use crate::store::{EventStore, StoreError};

/// Number of sequencing stripes
const SEQUENCER_STRIPES: usize = 64;

/// Errors surfaced to ingesting callers
#[derive(Debug, Error)]
pub enum IngestError {
    /// The event could not be persisted; nothing was broadcast
    #[error("failed to persist event: {0}")]
    Store(#[from] StoreError),
}

/// Per-channel ordering of persist-then-publish
struct Sequencer {
    stripes: Vec<Mutex<()>>,
    hasher: RandomState,
}

impl Sequencer {
    fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn stripe(&self, channel: &ChannelId) -> &Mutex<()> {
        let index = self.hasher.hash_one(channel) as usize % self.stripes.len();
        &self.stripes[index]
    }
}

/// Persists inbound calls and publishes them
pub struct Ingestor {
    store: Arc<dyn EventStore>,
    dispatcher: Dispatcher,
    metrics: Arc<HubMetrics>,
    sequencer: Sequencer,
}

impl Ingestor {
    /// Create an ingestor over a store and dispatcher
    pub fn new(store: Arc<dyn EventStore>, dispatcher: Dispatcher, metrics: Arc<HubMetrics>) -> Self {
        Self {
            store,
            dispatcher,
            metrics,
            sequencer: Sequencer::new(SEQUENCER_STRIPES),
        }
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Persist one inbound call and broadcast it
    ///
    /// Returns the persisted event. Fails only if the store rejects the
    /// write, in which case nothing is published.
    pub async fn ingest(
        &self,
        channel: ChannelId,
        method: impl Into<String>,
        headers: Headers,
        body: Value,
    ) -> Result<Arc<Event>, IngestError> {
        let new = NewEvent::new(channel, method, headers, body);
        let (event, report) = self.persist_and_publish(new).await?;

        tracing::debug!(
            channel = %event.channel,
            event_id = %event.id,
            method = %event.method,
            delivered = report.delivered,
            "Event ingested"
        );

        Ok(event)
    }

    async fn persist_and_publish(
        &self,
        new: NewEvent,
    ) -> Result<(Arc<Event>, DispatchReport), IngestError> {
        let _order = self.sequencer.stripe(&new.channel).lock().await;
        let channel = new.channel.clone();

        let event = match self.store.append(new).await {
            Ok(event) => event,
            Err(e) => {
                self.metrics.ingest_failed();
                tracing::error!(
                    channel = %channel,
                    store = self.store.name(),
                    error = %e,
                    "Failed to persist event"
                );
                return Err(e.into());
            }
        };
        self.metrics.event_ingested();

        let report = self.dispatcher.publish(&event);
        Ok((event, report))
    }
}
