//! Event persistence
//!
//! The [`EventStore`] trait is the durable side of ingestion: events are
//! appended before they are broadcast, and the history endpoint reads the
//! newest events of a channel back out. Records older than the retention
//! window are no longer returned and are purged by a periodic sweep.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryEventStore`]: in-process index, lost on restart
//! - [`JournalEventStore`]: the same index backed by an append-only JSON
//!   lines file that is replayed on startup

pub mod journal;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::{Event, NewEvent};
use crate::registry::ChannelId;

pub use journal::JournalEventStore;
pub use memory::MemoryEventStore;

/// Maximum number of events a history query returns
pub const MAX_HISTORY_LIMIT: usize = 50;

/// Default retention window (24 hours)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors raised by an event store
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure writing or reading the backing medium
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event could not be encoded or decoded
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store is not accepting writes
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable append/query store for events
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist an event
    ///
    /// Assigns the event ID and a `received_at` that is non-decreasing per
    /// channel. Returns only once the event is durable for this store.
    async fn append(&self, event: NewEvent) -> Result<Arc<Event>>;

    /// Newest unexpired events of a channel, newest first
    ///
    /// `limit` is capped at [`MAX_HISTORY_LIMIT`]. Unknown channels yield an
    /// empty list.
    async fn history(&self, channel: &ChannelId, limit: usize) -> Result<Vec<Arc<Event>>>;

    /// Drop expired events, returning how many were removed
    async fn purge_expired(&self) -> Result<usize>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// Convert a std retention window into a chrono delta
pub(crate) fn retention_delta(retention: Duration) -> chrono::TimeDelta {
    chrono::TimeDelta::from_std(retention).unwrap_or(chrono::TimeDelta::MAX)
}
