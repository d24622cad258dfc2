//! Subscriber handles
//!
//! A [`SubscriberHandle`] is the registry's routing reference to one live
//! streaming connection: the sending half of that connection's bounded
//! event queue. The connection owns the receiving half; when it goes away
//! every push through the handle fails and the dispatcher evicts it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::event::Event;

/// Counter for generating unique subscriber IDs
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one streaming connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate the next process-wide ID
    pub fn next() -> Self {
        Self(SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Result of pushing one event to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Event queued for the connection
    Delivered,
    /// Connection is gone (receiver dropped or handle retired)
    Closed,
    /// Connection queue is full; the consumer is not keeping up
    Lagged,
}

impl DeliveryOutcome {
    /// Whether the handle must be evicted after this outcome
    pub fn is_failure(&self) -> bool {
        !matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Registry-side reference to one streaming connection
///
/// Cloning is cheap; clones share the queue and the retired flag.
#[derive(Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    sender: mpsc::Sender<Arc<Event>>,
    retired: Arc<AtomicBool>,
    connected_at: Instant,
}

impl SubscriberHandle {
    /// Create a handle and the receiving end of its queue
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Arc<Event>>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: SubscriberId::next(),
            sender,
            retired: Arc::new(AtomicBool::new(false)),
            connected_at: Instant::now(),
        };
        (handle, receiver)
    }

    /// Get the subscriber ID
    #[inline]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// When the connection subscribed
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Push an event without waiting
    ///
    /// Never blocks: a full queue reports [`DeliveryOutcome::Lagged`].
    pub fn push(&self, event: Arc<Event>) -> DeliveryOutcome {
        if self.retired.load(Ordering::Acquire) {
            return DeliveryOutcome::Closed;
        }

        match self.sender.try_send(event) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(TrySendError::Full(_)) => DeliveryOutcome::Lagged,
            Err(TrySendError::Closed(_)) => DeliveryOutcome::Closed,
        }
    }

    /// Check if the receiving side is still alive
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.retired.load(Ordering::Acquire) && !self.sender.is_closed()
    }

    /// Mark the handle as removed from the registry
    ///
    /// Pushes through stale snapshots fail from this point on.
    pub(super) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}
