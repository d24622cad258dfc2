//! In-memory event store
//!
//! Events are kept per channel in arrival order. Because `received_at` is
//! non-decreasing within a channel, the newest events are at the back and
//! expiry only ever trims from the front.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;

use super::{retention_delta, EventStore, Result, DEFAULT_RETENTION, MAX_HISTORY_LIMIT};
use crate::event::{Event, NewEvent};
use crate::registry::ChannelId;

/// Default number of events retained per channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Event store held entirely in process memory
#[derive(Debug)]
pub struct MemoryEventStore {
    /// Per-channel events, oldest first
    channels: RwLock<HashMap<ChannelId, VecDeque<Arc<Event>>>>,
    retention: TimeDelta,
    channel_capacity: usize,
}

impl MemoryEventStore {
    /// Create a store with the default 24 hour retention
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Create a store with a custom retention window
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            retention: retention_delta(retention),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Cap the number of events kept per channel (oldest are dropped first)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(MAX_HISTORY_LIMIT);
        self
    }

    /// Total number of stored events
    pub fn len(&self) -> usize {
        self.channels.read().values().map(VecDeque::len).sum()
    }

    /// Check if the store holds no events
    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// Number of channels with stored events
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// All stored events, each channel oldest first
    pub(crate) fn events(&self) -> Vec<Arc<Event>> {
        self.channels
            .read()
            .values()
            .flat_map(|events| events.iter().cloned())
            .collect()
    }

    /// Persist an event as of `now`
    pub(crate) fn append_at(&self, new: NewEvent, now: DateTime<Utc>) -> Arc<Event> {
        let mut channels = self.channels.write();
        let events = channels.entry(new.channel.clone()).or_default();

        let received_at = match events.back() {
            Some(last) if last.received_at > now => last.received_at,
            _ => now,
        };
        let event = Arc::new(new.into_event(received_at));

        events.push_back(Arc::clone(&event));
        while events.len() > self.channel_capacity {
            events.pop_front();
        }

        event
    }

    /// Timestamp the next event on `channel` would receive as of `now`
    pub(crate) fn next_received_at(&self, channel: &ChannelId, now: DateTime<Utc>) -> DateTime<Utc> {
        self.channels
            .read()
            .get(channel)
            .and_then(VecDeque::back)
            .map_or(now, |last| last.received_at.max(now))
    }

    /// Insert an event that already has its identity and timestamp
    ///
    /// Callers must insert in `received_at` order per channel.
    pub(crate) fn insert(&self, event: Arc<Event>) {
        let mut channels = self.channels.write();
        let events = channels.entry(event.channel.clone()).or_default();

        events.push_back(event);
        while events.len() > self.channel_capacity {
            events.pop_front();
        }
    }

    /// Newest unexpired events as of `now`
    pub(crate) fn history_at(
        &self,
        channel: &ChannelId,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<Arc<Event>> {
        let limit = limit.min(MAX_HISTORY_LIMIT);
        let cutoff = self.cutoff(now);
        let channels = self.channels.read();

        let Some(events) = channels.get(channel) else {
            return Vec::new();
        };

        events
            .iter()
            .rev()
            .take_while(|e| cutoff.map_or(true, |c| e.received_at > c))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Remove events that expired as of `now`
    pub(crate) fn purge_at(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = self.cutoff(now) else {
            return 0;
        };

        let mut channels = self.channels.write();
        let mut removed = 0;

        channels.retain(|_, events| {
            while events.front().is_some_and(|e| e.received_at <= cutoff) {
                events.pop_front();
                removed += 1;
            }
            !events.is_empty()
        });

        removed
    }

    /// Check if an event timestamp is past retention as of `now`
    pub(crate) fn is_expired(&self, received_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff(now).is_some_and(|c| received_at <= c)
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_signed(self.retention)
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<Arc<Event>> {
        Ok(self.append_at(event, Utc::now()))
    }

    async fn history(&self, channel: &ChannelId, limit: usize) -> Result<Vec<Arc<Event>>> {
        Ok(self.history_at(channel, limit, Utc::now()))
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(self.purge_at(Utc::now()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
