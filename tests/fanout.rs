//! Integration tests for subscription fan-out
//!
//! Exercises the registry, dispatcher and ingestor together without HTTP.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use hookcast::{
    registry::RegistryConfig, ChannelId, Dispatcher, Headers, HubMetrics, Ingestor,
    MemoryEventStore, SubscriptionRegistry,
};

struct Hub {
    registry: Arc<SubscriptionRegistry>,
    metrics: Arc<HubMetrics>,
    ingestor: Arc<Ingestor>,
}

fn hub(buffer: usize) -> Hub {
    let registry = Arc::new(SubscriptionRegistry::with_config(
        RegistryConfig::default().subscriber_buffer(buffer),
    ));
    let metrics = Arc::new(HubMetrics::new());
    let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&metrics));
    let ingestor = Arc::new(Ingestor::new(
        Arc::new(MemoryEventStore::new()),
        dispatcher,
        Arc::clone(&metrics),
    ));
    Hub {
        registry,
        metrics,
        ingestor,
    }
}

fn channel(name: &str) -> ChannelId {
    ChannelId::parse(name).unwrap()
}

#[tokio::test]
async fn test_every_subscriber_sees_same_order() {
    let hub = hub(256);
    let mut subs: Vec<_> = (0..3).map(|_| hub.registry.open(&channel("demo"))).collect();

    for n in 0..100 {
        hub.ingestor
            .ingest(channel("demo"), "POST", Headers::new(), json!({ "n": n }))
            .await
            .unwrap();
    }

    for sub in &mut subs {
        let mut seen = Vec::new();
        while let Some(event) = sub.try_recv() {
            seen.push(event.body["n"].as_i64().unwrap());
        }
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_slow_subscriber_evicted_others_unaffected() {
    let hub = hub(2);
    let mut fast = hub.registry.open(&channel("demo"));
    let mut slow = hub.registry.open(&channel("demo"));

    for n in 0..5 {
        hub.ingestor
            .ingest(channel("demo"), "POST", Headers::new(), json!({ "n": n }))
            .await
            .unwrap();
        assert_eq!(fast.try_recv().unwrap().body["n"], n);
    }

    // Slow kept what fit in its queue, then was dropped
    assert_eq!(slow.try_recv().unwrap().body["n"], 0);
    assert_eq!(slow.try_recv().unwrap().body["n"], 1);
    assert!(slow.recv().await.is_none());

    assert_eq!(hub.registry.subscriber_count(&channel("demo")), 1);
    assert!(hub.registry.is_subscribed(&channel("demo"), fast.id()));

    let stats = hub.metrics.snapshot(hub.registry.stats());
    assert_eq!(stats.evicted_lagged, 1);
}

#[tokio::test]
async fn test_no_delivery_after_unsubscribe() {
    let hub = hub(16);
    let sub = hub.registry.open(&channel("demo"));
    let id = sub.id();
    let handles = hub.registry.snapshot(&channel("demo"));

    drop(sub);
    assert!(!hub.registry.is_subscribed(&channel("demo"), id));

    // A snapshot taken before the unsubscribe cannot deliver
    for handle in handles {
        assert!(handle.push(Arc::new(
            hookcast::NewEvent::new(channel("demo"), "POST", Headers::new(), json!(null))
                .into_event(chrono::Utc::now())
        ))
        .is_failure());
    }
}

fn stray_event(name: &str) -> Arc<hookcast::Event> {
    Arc::new(
        hookcast::NewEvent::new(channel(name), "POST", Headers::new(), json!(null))
            .into_event(chrono::Utc::now()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_subscribe_unsubscribe_and_publish() {
    let hub = Arc::new(hub(1024));
    let names = ["a", "b", "c", "d"];
    // Highest `n` whose ingest has returned, per channel
    let marks: Arc<Vec<AtomicI64>> = Arc::new(names.iter().map(|_| AtomicI64::new(-1)).collect());

    let churn: Vec<_> = (0..16)
        .map(|i| {
            let registry = Arc::clone(&hub.registry);
            let marks = Arc::clone(&marks);
            let k = i % names.len();
            let name = names[k];
            tokio::spawn(async move {
                for _ in 0..50 {
                    let mark = marks[k].load(Ordering::SeqCst);
                    let mut sub = registry.open(&channel(name));
                    let own: Vec<_> = registry
                        .snapshot(&channel(name))
                        .into_iter()
                        .filter(|h| h.id() == sub.id())
                        .collect();
                    assert_eq!(own.len(), 1);

                    tokio::task::yield_now().await;

                    // Events finished before subscribing are never delivered
                    while let Some(event) = sub.try_recv() {
                        let n = event.body["n"].as_i64().unwrap();
                        assert!(n > mark, "got n={} but subscribed after n={}", n, mark);
                    }

                    drop(sub);
                    for handle in own {
                        assert!(handle.push(stray_event(name)).is_failure());
                    }
                }
            })
        })
        .collect();

    let publishers: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(k, name)| {
            let ingestor = Arc::clone(&hub.ingestor);
            let marks = Arc::clone(&marks);
            let name = *name;
            tokio::spawn(async move {
                for n in 0..50 {
                    ingestor
                        .ingest(channel(name), "POST", Headers::new(), json!({ "n": n }))
                        .await
                        .unwrap();
                    marks[k].store(n, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for task in churn.into_iter().chain(publishers) {
        tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .expect("task hung")
            .unwrap();
    }

    // Every guard was dropped; no channel entry survives
    assert_eq!(hub.registry.channel_count(), 0);
    let stats = hub.registry.stats();
    assert_eq!(stats.subscribers, 0);
    assert_eq!(stats.total_subscribed, stats.total_unsubscribed);
    assert_eq!(stats.total_subscribed, 16 * 50);
}
