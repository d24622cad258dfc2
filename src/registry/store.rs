//! Subscription registry implementation
//!
//! The central registry that tracks which connections are listening to which
//! channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::channel::ChannelId;
use super::config::RegistryConfig;
use super::entry::{ChannelEntry, ChannelStats, RegistryStats};
use super::subscriber::{SubscriberHandle, SubscriberId};
use super::subscription::Subscription;

/// Central registry for all live subscriptions
///
/// Thread-safe via a single `Mutex` that is never held across an await point
/// or during delivery. Delivery works on [`snapshot`](Self::snapshot) copies,
/// so slow or failing connections never stall subscribe/unsubscribe.
pub struct SubscriptionRegistry {
    /// Map of channel to attached subscribers; no empty entries
    channels: Mutex<HashMap<ChannelId, ChannelEntry>>,

    /// Configuration
    config: RegistryConfig,

    total_subscribed: AtomicU64,
    total_unsubscribed: AtomicU64,

    /// Set by `close_all` while holding the channels lock
    closed: AtomicBool,
}

impl SubscriptionRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            config,
            total_subscribed: AtomicU64::new(0),
            total_unsubscribed: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Open a subscription for a new connection
    ///
    /// Allocates a handle with a bounded queue, registers it under `channel`
    /// and returns the guard that owns the receiving end. Dropping the guard
    /// unsubscribes. After [`close_all`](Self::close_all) the returned
    /// subscription is already detached and yields nothing.
    pub fn open(self: &Arc<Self>, channel: &ChannelId) -> Subscription {
        let (handle, receiver) = SubscriberHandle::channel(self.config.subscriber_buffer);
        let id = handle.id();
        self.subscribe(channel, handle);
        Subscription::new(Arc::clone(self), channel.clone(), id, receiver)
    }

    /// Register a handle under a channel
    ///
    /// Creates the channel entry on demand. Registering the same handle twice
    /// is a no-op. Once the registry is closed the handle is retired instead
    /// and `false` is returned.
    pub fn subscribe(&self, channel: &ChannelId, handle: SubscriberHandle) -> bool {
        let id = handle.id();
        let mut channels = self.channels.lock();

        if self.closed.load(Ordering::Acquire) {
            drop(channels);
            handle.retire();
            tracing::debug!(
                channel = %channel,
                subscriber = %id,
                "Registry closed, subscriber rejected"
            );
            return false;
        }

        let entry = channels.entry(channel.clone()).or_insert_with(ChannelEntry::new);
        if entry.insert(handle) {
            self.total_subscribed.fetch_add(1, Ordering::Relaxed);
        }
        let subscribers = entry.len();
        drop(channels);

        tracing::info!(
            channel = %channel,
            subscriber = %id,
            subscribers = subscribers,
            "Subscriber added"
        );

        true
    }

    /// Remove a handle from a channel
    ///
    /// Drops the channel entry once its last subscriber leaves. Removing a
    /// handle that is not registered is a no-op; returns whether a handle
    /// was actually removed.
    pub fn unsubscribe(&self, channel: &ChannelId, id: SubscriberId) -> bool {
        let mut channels = self.channels.lock();

        let Some(entry) = channels.get_mut(channel) else {
            return false;
        };
        let Some(handle) = entry.remove(id) else {
            return false;
        };
        handle.retire();

        let remaining = entry.len();
        if entry.is_empty() {
            channels.remove(channel);
        }
        drop(channels);

        self.total_unsubscribed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            channel = %channel,
            subscriber = %id,
            subscribers = remaining,
            "Subscriber removed"
        );

        true
    }

    /// Copy of the handles currently attached to a channel
    ///
    /// Empty when the channel has no subscribers.
    pub fn snapshot(&self, channel: &ChannelId) -> Vec<SubscriberHandle> {
        self.channels
            .lock()
            .get(channel)
            .map(ChannelEntry::snapshot)
            .unwrap_or_default()
    }

    /// Check if a handle is registered under a channel
    pub fn is_subscribed(&self, channel: &ChannelId, id: SubscriberId) -> bool {
        self.channels
            .lock()
            .get(channel)
            .is_some_and(|entry| entry.contains(id))
    }

    /// Check if a channel has any subscribers
    pub fn contains_channel(&self, channel: &ChannelId) -> bool {
        self.channels.lock().contains_key(channel)
    }

    /// Number of subscribers attached to a channel
    pub fn subscriber_count(&self, channel: &ChannelId) -> usize {
        self.channels.lock().get(channel).map_or(0, ChannelEntry::len)
    }

    /// Number of channels with at least one subscriber
    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Check if `close_all` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get channel statistics
    pub fn channel_stats(&self, channel: &ChannelId) -> Option<ChannelStats> {
        self.channels.lock().get(channel).map(|entry| ChannelStats {
            subscriber_count: entry.len(),
            active_secs: entry.age().as_secs(),
        })
    }

    /// Get registry-wide statistics
    pub fn stats(&self) -> RegistryStats {
        let channels = self.channels.lock();
        RegistryStats {
            channels: channels.len(),
            subscribers: channels.values().map(ChannelEntry::len).sum(),
            total_subscribed: self.total_subscribed.load(Ordering::Relaxed),
            total_unsubscribed: self.total_unsubscribed.load(Ordering::Relaxed),
        }
    }

    /// Detach every subscriber and refuse new ones
    ///
    /// Used on shutdown: dropping the registry's senders ends every open
    /// stream once its queue drains, and streams opened afterwards end
    /// immediately. Returns the number of handles removed.
    pub fn close_all(&self) -> usize {
        let mut channels = self.channels.lock();
        self.closed.store(true, Ordering::Release);
        let mut removed = 0;

        for (_, mut entry) in channels.drain() {
            for handle in entry.drain() {
                handle.retire();
                removed += 1;
            }
        }
        drop(channels);

        self.total_unsubscribed
            .fetch_add(removed as u64, Ordering::Relaxed);
        tracing::info!(subscribers = removed, "All subscribers detached");

        removed
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
