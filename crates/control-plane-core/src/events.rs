//! Synchronous in-process event fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use spi::{Event, EventEnvelope, EventRouter, EventSubscriber};
use tracing::debug;

/// Delivers every event to every subscriber, in subscription order, before
/// `publish` returns.
#[derive(Default)]
pub struct SyncEventRouter {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl SyncEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl std::fmt::Debug for SyncEventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEventRouter")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[async_trait]
impl EventRouter for SyncEventRouter {
    fn register(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    async fn publish(&self, event: Event) {
        let envelope = EventEnvelope::new(event);
        // Snapshot so the lock is not held across await points.
        let subscribers: Vec<Arc<dyn EventSubscriber>> = self.subscribers.read().clone();
        debug!(
            event_id = %envelope.id,
            subscribers = subscribers.len(),
            payload = ?envelope.payload,
            "Publishing event"
        );
        for subscriber in subscribers {
            subscriber.on_event(&envelope).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        tag: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl EventSubscriber for Recorder {
        async fn on_event(&self, event: &EventEnvelope) {
            if let Event::AssetCreated { asset_id } = &event.payload {
                self.seen.lock().push(format!("{}:{asset_id}", self.tag));
            }
        }
    }

    #[tokio::test]
    async fn delivers_to_all_subscribers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let router = SyncEventRouter::new();
        for tag in ["first", "second"] {
            router.register(Arc::new(Recorder {
                tag,
                seen: Arc::clone(&seen),
            }));
        }

        router
            .publish(Event::AssetCreated {
                asset_id: "a1".into(),
            })
            .await;

        assert_eq!(*seen.lock(), vec!["first:a1", "second:a1"]);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let router = SyncEventRouter::new();
        router
            .publish(Event::AssetDeleted {
                asset_id: "a1".into(),
            })
            .await;
        assert_eq!(router.subscriber_count(), 0);
    }
}
