//! Webhook capture with live per-channel fan-out
//!
//! Inbound HTTP calls on `/in/{channel}` are persisted as events and then
//! broadcast to every client holding an open Server-Sent Events stream on
//! the same channel. Recent events stay queryable through `/history/{channel}`
//! for the retention window (24 hours by default).
//!
//! # Example
//!
//! ```no_run
//! use hookcast::{HookServer, ServerConfig};
//!
//! # async fn run() -> hookcast::Result<()> {
//! let config = ServerConfig::default().journal("./data/events.jsonl");
//! let server = HookServer::from_config(config).await?;
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod event;
pub mod ingest;
pub mod registry;
pub mod server;
pub mod stats;
pub mod store;

pub use dispatch::{DispatchReport, Dispatcher};
pub use error::{Error, Result};
pub use event::{Event, Headers, NewEvent};
pub use ingest::{IngestError, Ingestor};
pub use registry::{ChannelId, Subscription, SubscriptionRegistry};
pub use server::{AppState, HookServer, ServerConfig};
pub use stats::{HubMetrics, HubStats};
pub use store::{EventStore, JournalEventStore, MemoryEventStore, StoreError};
