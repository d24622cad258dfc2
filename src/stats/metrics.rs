//! Statistics for ingestion and fan-out

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::registry::RegistryStats;

/// Live counters shared by the ingestion path and the dispatcher
#[derive(Debug)]
pub struct HubMetrics {
    started_at: Instant,
    events_ingested: AtomicU64,
    ingest_failures: AtomicU64,
    deliveries: AtomicU64,
    evicted_closed: AtomicU64,
    evicted_lagged: AtomicU64,
}

impl HubMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            events_ingested: AtomicU64::new(0),
            ingest_failures: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            evicted_closed: AtomicU64::new(0),
            evicted_lagged: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn event_ingested(&self) {
        self.events_ingested.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn ingest_failed(&self) {
        self.ingest_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn delivered(&self, count: usize) {
        self.deliveries.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn evicted_closed(&self) {
        self.evicted_closed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn evicted_lagged(&self) {
        self.evicted_lagged.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the counters were created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Point-in-time copy of the counters combined with registry state
    pub fn snapshot(&self, registry: RegistryStats) -> HubStats {
        HubStats {
            uptime_secs: self.uptime().as_secs(),
            events_ingested: self.events_ingested.load(Ordering::Relaxed),
            ingest_failures: self.ingest_failures.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            evicted_closed: self.evicted_closed.load(Ordering::Relaxed),
            evicted_lagged: self.evicted_lagged.load(Ordering::Relaxed),
            registry,
        }
    }
}

impl Default for HubMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-wide statistics, as served by `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct HubStats {
    /// Seconds since startup
    pub uptime_secs: u64,
    /// Events persisted
    pub events_ingested: u64,
    /// Ingest calls rejected by the store
    pub ingest_failures: u64,
    /// Successful pushes to subscribers
    pub deliveries: u64,
    /// Subscribers evicted because their connection was gone
    pub evicted_closed: u64,
    /// Subscribers evicted because their queue was full
    pub evicted_lagged: u64,
    /// Registry state
    pub registry: RegistryStats,
}

impl HubStats {
    /// Total evictions for any reason
    pub fn evictions(&self) -> u64 {
        self.evicted_closed + self.evicted_lagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let metrics = HubMetrics::new();
        let stats = metrics.snapshot(RegistryStats::default());

        assert_eq!(stats.events_ingested, 0);
        assert_eq!(stats.ingest_failures, 0);
        assert_eq!(stats.deliveries, 0);
        assert_eq!(stats.evictions(), 0);
    }

    #[test]
    fn test_counters() {
        let metrics = HubMetrics::new();
        metrics.event_ingested();
        metrics.event_ingested();
        metrics.ingest_failed();
        metrics.delivered(5);
        metrics.evicted_closed();
        metrics.evicted_lagged();
        metrics.evicted_lagged();

        let stats = metrics.snapshot(RegistryStats {
            channels: 1,
            subscribers: 4,
            ..Default::default()
        });

        assert_eq!(stats.events_ingested, 2);
        assert_eq!(stats.ingest_failures, 1);
        assert_eq!(stats.deliveries, 5);
        assert_eq!(stats.evicted_closed, 1);
        assert_eq!(stats.evicted_lagged, 2);
        assert_eq!(stats.evictions(), 3);
        assert_eq!(stats.registry.subscribers, 4);
    }

    #[test]
    fn test_serializes() {
        let stats = HubMetrics::new().snapshot(RegistryStats::default());
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["deliveries"], 0);
        assert_eq!(value["registry"]["channels"], 0);
    }
}
