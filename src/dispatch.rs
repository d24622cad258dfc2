//! Broadcast dispatcher
//!
//! Pushes a persisted event to every subscriber of its channel. Delivery is
//! fire-and-forget: each push is a non-blocking enqueue, one subscriber's
//! failure never affects another, and nothing is reported back to the
//! ingesting caller except a [`DispatchReport`] for bookkeeping.
//!
//! A push that fails, because the connection is gone or its queue is full,
//! always evicts that subscriber from the registry. This is the only way
//! stale registrations are reclaimed besides the connection's own guard.

use std::sync::Arc;

use crate::event::Event;
use crate::registry::{DeliveryOutcome, SubscriptionRegistry};
use crate::stats::HubMetrics;

/// Outcome summary of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscribers the event was queued for
    pub delivered: usize,
    /// Subscribers evicted during this publish
    pub evicted: usize,
}

/// Fans persisted events out to live subscribers
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    metrics: Arc<HubMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry
    pub fn new(registry: Arc<SubscriptionRegistry>, metrics: Arc<HubMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Get the underlying registry
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Push an event to every subscriber of its channel
    ///
    /// Works on a registry snapshot, so the registry lock is not held while
    /// pushing. Never fails.
    pub fn publish(&self, event: &Arc<Event>) -> DispatchReport {
        let channel = &event.channel;
        let handles = self.registry.snapshot(channel);
        let mut report = DispatchReport::default();

        if handles.is_empty() {
            tracing::trace!(channel = %channel, event_id = %event.id, "No subscribers");
            return report;
        }

        for handle in handles {
            match handle.push(Arc::clone(event)) {
                DeliveryOutcome::Delivered => report.delivered += 1,
                outcome => {
                    // The guard may have raced us to it; only count real removals
                    if self.registry.unsubscribe(channel, handle.id()) {
                        report.evicted += 1;
                        match outcome {
                            DeliveryOutcome::Lagged => self.metrics.evicted_lagged(),
                            _ => self.metrics.evicted_closed(),
                        }
                    }

                    tracing::debug!(
                        channel = %channel,
                        subscriber = %handle.id(),
                        outcome = ?outcome,
                        "Delivery failed, subscriber evicted"
                    );
                }
            }
        }

        self.metrics.delivered(report.delivered);

        tracing::debug!(
            channel = %channel,
            event_id = %event.id,
            delivered = report.delivered,
            evicted = report.evicted,
            "Event dispatched"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::event::{Headers, NewEvent};
    use crate::registry::{ChannelId, RegistryConfig, SubscriberHandle};

    fn setup() -> (Arc<SubscriptionRegistry>, Dispatcher) {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::new(HubMetrics::new()));
        (registry, dispatcher)
    }

    fn event(channel: &ChannelId, n: i64) -> Arc<Event> {
        Arc::new(
            NewEvent::new(channel.clone(), "POST", Headers::new(), json!({ "n": n }))
                .into_event(Utc::now()),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber_once() {
        let (registry, dispatcher) = setup();
        let demo = ChannelId::parse("demo").unwrap();

        let mut s1 = registry.open(&demo);
        let mut s2 = registry.open(&demo);

        let ev = event(&demo, 1);
        let report = dispatcher.publish(&ev);
        assert_eq!(report, DispatchReport { delivered: 2, evicted: 0 });

        assert_eq!(s1.recv().await.unwrap().id, ev.id);
        assert_eq!(s2.recv().await.unwrap().id, ev.id);
        assert!(s1.try_recv().is_none());
        assert!(s2.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_publish_only_to_event_channel() {
        let (registry, dispatcher) = setup();
        let a = ChannelId::parse("a").unwrap();
        let b = ChannelId::parse("b").unwrap();

        let mut sa = registry.open(&a);
        let mut sb = registry.open(&b);

        dispatcher.publish(&event(&a, 1));

        assert!(sa.recv().await.is_some());
        assert!(sb.try_recv().is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let (registry, dispatcher) = setup();
        let demo = ChannelId::parse("demo").unwrap();

        let report = dispatcher.publish(&event(&demo, 1));
        assert_eq!(report, DispatchReport::default());
        // Publishing never creates a channel entry
        assert!(!registry.contains_channel(&demo));
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_evicted() {
        let (registry, dispatcher) = setup();
        let demo = ChannelId::parse("demo").unwrap();

        let (dead, rx) = SubscriberHandle::channel(8);
        registry.subscribe(&demo, dead);
        drop(rx);
        let mut live = registry.open(&demo);

        let report = dispatcher.publish(&event(&demo, 1));
        assert_eq!(report, DispatchReport { delivered: 1, evicted: 1 });

        assert_eq!(registry.subscriber_count(&demo), 1);
        assert!(live.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_is_evicted() {
        let registry = Arc::new(SubscriptionRegistry::with_config(
            RegistryConfig::default().subscriber_buffer(2),
        ));
        let metrics = Arc::new(HubMetrics::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&metrics));
        let demo = ChannelId::parse("demo").unwrap();

        let mut slow = registry.open(&demo);

        assert_eq!(dispatcher.publish(&event(&demo, 1)).delivered, 1);
        assert_eq!(dispatcher.publish(&event(&demo, 2)).delivered, 1);
        assert_eq!(dispatcher.publish(&event(&demo, 3)).evicted, 1);
        assert!(!registry.contains_channel(&demo));

        // The queued events drain, then the stream ends
        assert_eq!(slow.recv().await.unwrap().body["n"], 1);
        assert_eq!(slow.recv().await.unwrap().body["n"], 2);
        assert!(slow.recv().await.is_none());

        let stats = metrics.snapshot(registry.stats());
        assert_eq!(stats.evicted_lagged, 1);
        assert_eq!(stats.deliveries, 2);
    }

    #[tokio::test]
    async fn test_unsubscribed_handle_gets_nothing() {
        let (registry, dispatcher) = setup();
        let demo = ChannelId::parse("demo").unwrap();

        let (handle, mut rx) = SubscriberHandle::channel(8);
        let id = handle.id();
        registry.subscribe(&demo, handle);

        dispatcher.publish(&event(&demo, 1));
        registry.unsubscribe(&demo, id);
        dispatcher.publish(&event(&demo, 2));

        assert_eq!(rx.recv().await.unwrap().body["n"], 1);
        // Registry dropped its sender on unsubscribe
        assert!(rx.recv().await.is_none());
    }
}
