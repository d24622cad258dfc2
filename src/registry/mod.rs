//! Subscription registry for channel fan-out
//!
//! The registry tracks which live connections listen to which channel. It is
//! the only shared mutable state in the broadcast path: every subscribe,
//! unsubscribe and broadcast lookup goes through its synchronized interface.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<SubscriptionRegistry>
//!                    ┌───────────────────────────┐
//!                    │ channels: Mutex<HashMap<  │
//!                    │   ChannelId,              │
//!                    │   ChannelEntry {          │
//!                    │     id -> Handle(mpsc::Tx)│
//!                    │   }                       │
//!                    │ >>                        │
//!                    └─────────────┬─────────────┘
//!                                  │ snapshot()
//!         ┌────────────────────────┼────────────────────────┐
//!         │                        │                        │
//!         ▼                        ▼                        ▼
//!    [Ingestor]              [Subscription]           [Subscription]
//!    dispatcher.publish()    rx.recv()                rx.recv()
//!         │                        │                        │
//!         └──► handle.push() ──────┴──► SSE ──► client      │
//! ```
//!
//! # Lifecycle
//!
//! Channels are implicit: an entry is created by the first subscribe and
//! removed when its last subscriber leaves. A [`Subscription`] guard
//! unsubscribes on drop; the dispatcher unsubscribes handles whose delivery
//! fails.

pub mod channel;
pub mod config;
pub mod entry;
pub mod error;
pub mod store;
pub mod subscriber;
pub mod subscription;

pub use channel::{ChannelId, MAX_CHANNEL_LEN};
pub use config::RegistryConfig;
pub use entry::{ChannelStats, RegistryStats};
pub use error::ChannelError;
pub use store::SubscriptionRegistry;
pub use subscriber::{DeliveryOutcome, SubscriberHandle, SubscriberId};
pub use subscription::Subscription;
