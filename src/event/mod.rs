//! Webhook event types
//!
//! An [`Event`] is one captured inbound call. It is created by the event store
//! at persistence time (which assigns `id` and `received_at`) and is never
//! mutated afterwards; it travels through the system as `Arc<Event>` so the
//! store, the dispatcher and every subscriber share one allocation.

pub mod body;
pub mod headers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::registry::ChannelId;

pub use body::decode_body;
pub use headers::{HeaderValues, Headers};

/// A persisted webhook event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,
    /// Channel the call was addressed to
    pub channel: ChannelId,
    /// HTTP method of the inbound call
    pub method: String,
    /// Request headers in arrival order
    pub headers: Headers,
    /// Decoded request body
    pub body: Value,
    /// Persistence timestamp, non-decreasing per channel
    pub received_at: DateTime<Utc>,
}

/// An inbound call that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Target channel
    pub channel: ChannelId,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: Headers,
    /// Decoded request body
    pub body: Value,
}

impl NewEvent {
    /// Create a new unpersisted event
    pub fn new(channel: ChannelId, method: impl Into<String>, headers: Headers, body: Value) -> Self {
        Self {
            channel,
            method: method.into(),
            headers,
            body,
        }
    }

    /// Assign identity and timestamp, producing the immutable event
    pub fn into_event(self, received_at: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::new_v4(),
            channel: self.channel,
            method: self.method,
            headers: self.headers,
            body: self.body,
            received_at,
        }
    }
}
