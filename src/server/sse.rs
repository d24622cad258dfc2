//! Server-sent event streams
//!
//! An [`EventStream`] first replays a backlog of stored events (oldest
//! first) and then forwards live events from its [`Subscription`]. The
//! subscription is opened before the backlog is read, so no event is lost
//! between the two; an event persisted in that window can appear in both.
//! Every frame carries the event id so clients can drop the duplicate.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::sse;
use futures::Stream;
use tokio::sync::OwnedSemaphorePermit;

use crate::event::Event;
use crate::registry::Subscription;

/// SSE `event:` name used for every frame
pub const SSE_EVENT_NAME: &str = "webhook";

/// Backlog followed by live events for one connection
pub struct EventStream {
    backlog: VecDeque<Arc<Event>>,
    subscription: Subscription,
    /// Held for the lifetime of the stream
    _permit: Option<OwnedSemaphorePermit>,
}

impl EventStream {
    /// Create a stream; `backlog` must be oldest first
    pub fn new(
        backlog: impl IntoIterator<Item = Arc<Event>>,
        subscription: Subscription,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        Self {
            backlog: backlog.into_iter().collect(),
            subscription,
            _permit: permit,
        }
    }

    /// Channel this stream listens on
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

/// Encode an event as one SSE frame
pub fn to_sse_event(event: &Event) -> Result<sse::Event, axum::Error> {
    sse::Event::default()
        .event(SSE_EVENT_NAME)
        .id(event.id.to_string())
        .json_data(event)
}

impl Stream for EventStream {
    type Item = Result<sse::Event, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(event) = this.backlog.pop_front() {
            return Poll::Ready(Some(to_sse_event(&event)));
        }

        match Pin::new(&mut this.subscription).poll_next(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(to_sse_event(&event))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("channel", self.subscription.channel())
            .field("backlog", &self.backlog.len())
            .finish()
    }
}
