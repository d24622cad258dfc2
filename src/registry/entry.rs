//! Channel entry and statistics types
//!
//! This module defines the per-channel state stored in the registry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::subscriber::{SubscriberHandle, SubscriberId};

/// Entry for a single channel in the registry
///
/// Only exists while at least one subscriber is attached.
#[derive(Debug)]
pub(super) struct ChannelEntry {
    /// Attached subscribers keyed by connection ID
    subscribers: HashMap<SubscriberId, SubscriberHandle>,

    /// When the first subscriber arrived
    created_at: Instant,
}

impl ChannelEntry {
    pub(super) fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            created_at: Instant::now(),
        }
    }

    /// Insert a handle, replacing an earlier registration of the same ID
    ///
    /// Returns true if the handle was not present before.
    pub(super) fn insert(&mut self, handle: SubscriberHandle) -> bool {
        self.subscribers.insert(handle.id(), handle).is_none()
    }

    pub(super) fn remove(&mut self, id: SubscriberId) -> Option<SubscriberHandle> {
        self.subscribers.remove(&id)
    }

    pub(super) fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    pub(super) fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Copy of the current handles for lock-free delivery
    pub(super) fn snapshot(&self) -> Vec<SubscriberHandle> {
        self.subscribers.values().cloned().collect()
    }

    pub(super) fn drain(&mut self) -> impl Iterator<Item = SubscriberHandle> + '_ {
        self.subscribers.drain().map(|(_, handle)| handle)
    }

    pub(super) fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Statistics for a channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStats {
    /// Number of attached subscribers
    pub subscriber_count: usize,
    /// Seconds since the channel's first current subscriber attached
    pub active_secs: u64,
}

/// Registry-wide statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    /// Channels with at least one subscriber
    pub channels: usize,
    /// Attached subscribers across all channels
    pub subscribers: usize,
    /// Subscribe calls that added a new handle
    pub total_subscribed: u64,
    /// Unsubscribe calls that removed a handle
    pub total_unsubscribed: u64,
}
