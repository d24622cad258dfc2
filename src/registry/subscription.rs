//! Subscription guard
//!
//! A [`Subscription`] is the connection-side half of a registration. It owns
//! the receiving end of the subscriber queue and unsubscribes exactly once
//! when dropped, whether the connection ended cleanly, errored, was cancelled
//! or unwound from a panic.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::event::Event;

use super::channel::ChannelId;
use super::store::SubscriptionRegistry;
use super::subscriber::SubscriberId;

/// Live registration of one connection on one channel
///
/// Yields events in the order they were published to the channel. The stream
/// ends when the registry detaches the subscriber (eviction or shutdown).
pub struct Subscription {
    registry: Arc<SubscriptionRegistry>,
    channel: ChannelId,
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<Event>>,
}

impl Subscription {
    pub(super) fn new(
        registry: Arc<SubscriptionRegistry>,
        channel: ChannelId,
        id: SubscriberId,
        receiver: mpsc::Receiver<Arc<Event>>,
    ) -> Self {
        Self {
            registry,
            channel,
            id,
            receiver,
        }
    }

    /// Get the subscriber ID
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Channel this subscription listens to
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the subscriber has been detached and its queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.receiver.recv().await
    }

    /// Take an already queued event without waiting
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Arc<Event>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Close first so in-flight pushes from stale snapshots fail
        self.receiver.close();
        self.registry.unsubscribe(&self.channel, self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .finish()
    }
}
