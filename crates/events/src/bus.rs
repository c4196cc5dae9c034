//! Topic-addressed in-process event bus.
//!
//! Each subscriber owns one bounded channel shared across all of its topics,
//! so events published to any of a connection's topics arrive on a single
//! receiver in publish order. Publishing never blocks: a subscriber whose
//! channel is full or closed is dropped from the bus, which closes its
//! receiver and lets the connection terminate (the client reconnects).

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::event::WsEvent;

/// Per-subscriber channel capacity. Sized for short bursts to one
/// connection; anything slower than that is treated as a dead client.
pub const DEFAULT_CAPACITY: usize = 5;

struct Subscriber {
    topics: Vec<String>,
    tx: mpsc::Sender<WsEvent>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
    /// Topic name → subscriber ids. Kept consistent with `subscribers`.
    topics: HashMap<String, Vec<u64>>,
}

/// A live subscription returned by [`EventBus::subscribe`].
///
/// Dropping the receiver is not enough to free bus-side state; callers must
/// pass the `id` back to [`EventBus::unsubscribe`] when the connection ends.
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::Receiver<WsEvent>,
}

/// In-process topic-addressed publish/subscribe hub.
///
/// Shared via `Arc<EventBus>` across the application. Internally
/// synchronized; `publish` and `subscribe` may be called from any task.
pub struct EventBus {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Subscribe to a set of topics atomically.
    ///
    /// All topics share the returned channel, so delivery order on one
    /// connection follows publish order across its whole topic set.
    pub fn subscribe(&self, topics: Vec<String>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);

        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;

        for topic in &topics {
            inner.topics.entry(topic.clone()).or_default().push(id);
        }
        inner.subscribers.insert(id, Subscriber { topics, tx });

        Subscription { id, receiver: rx }
    }

    /// Remove a subscriber and all of its topic registrations.
    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        remove_subscriber(&mut inner, id);
    }

    /// Publish an event to every subscriber of `topic`.
    ///
    /// Non-blocking per subscriber. Subscribers that cannot accept the event
    /// (full or closed channel) are removed; other subscribers are
    /// unaffected. With no subscribers the event is silently dropped.
    pub fn publish(&self, topic: &str, event: &WsEvent) {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");

        let ids = match inner.topics.get(topic) {
            Some(ids) => ids.clone(),
            None => return,
        };

        let mut dead = Vec::new();
        for id in ids {
            let Some(subscriber) = inner.subscribers.get(&id) else {
                continue;
            };
            if subscriber.tx.try_send(event.clone()).is_err() {
                dead.push(id);
            }
        }

        for id in dead {
            tracing::debug!(subscriber = id, topic, "dropping slow event subscriber");
            remove_subscriber(&mut inner, id);
        }
    }

    /// Number of live subscribers, for shutdown logging.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .expect("event bus lock poisoned")
            .subscribers
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn remove_subscriber(inner: &mut Inner, id: u64) {
    let Some(subscriber) = inner.subscribers.remove(&id) else {
        return;
    };
    for topic in subscriber.topics {
        if let Some(ids) = inner.topics.get_mut(&topic) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                inner.topics.remove(&topic);
            }
        }
    }
    // Dropping `subscriber.tx` closes the receiver side.
}

#[cfg(test)]
mod tests {
    use crate::event::names;

    use super::*;

    #[tokio::test]
    async fn subscriber_receives_only_its_topics() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe(vec!["a".into()]);

        bus.publish("a", &WsEvent::new(names::REFRESH, ()));
        bus.publish("b", &WsEvent::new(names::QUEUE_OPEN, true));

        let event = sub.receiver.recv().await.expect("event on topic a");
        assert_eq!(event.event, names::REFRESH);
        assert!(sub.receiver.try_recv().is_err(), "topic b must not leak");
    }

    #[tokio::test]
    async fn multi_topic_subscription_shares_one_channel_in_order() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe(vec!["a".into(), "b".into()]);

        bus.publish("a", &WsEvent::new("FIRST", ()));
        bus.publish("b", &WsEvent::new("SECOND", ()));
        bus.publish("a", &WsEvent::new("THIRD", ()));

        for expected in ["FIRST", "SECOND", "THIRD"] {
            let event = sub.receiver.recv().await.expect("event");
            assert_eq!(event.event, expected);
        }
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_channel() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe(vec!["a".into()]);

        bus.unsubscribe(sub.id);
        bus.publish("a", &WsEvent::new(names::REFRESH, ()));

        assert!(sub.receiver.recv().await.is_none());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_is_dropped_without_blocking_others() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe(vec!["a".into()]);
        let mut fast = bus.subscribe(vec!["a".into()]);

        // Fill the slow subscriber's channel, then overflow it. The fast
        // subscriber drains as it goes and must see every event.
        for i in 0..3 {
            bus.publish("a", &WsEvent::new(&format!("E{i}"), ()));
            let event = fast.receiver.recv().await.expect("fast keeps up");
            assert_eq!(event.event, format!("E{i}"));
        }

        // The slow subscriber got the first two, then was removed.
        assert_eq!(slow.receiver.recv().await.unwrap().event, "E0");
        assert_eq!(slow.receiver.recv().await.unwrap().event, "E1");
        assert!(slow.receiver.recv().await.is_none(), "channel closed");
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_a_noop() {
        let bus = EventBus::default();
        bus.publish("nowhere", &WsEvent::new(names::REFRESH, ()));
    }
}
