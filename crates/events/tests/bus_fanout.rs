//! Fan-out tests exercising the bus the way the live-connection layer uses
//! it: one subscription per connection covering the connection's whole
//! topic set, with visibility-scoped publishing.

use ohq_core::Id;
use ohq_events::event::names;
use ohq_events::{topics, EventBus, WsEvent};

/// Topic set for a connection, mirroring the upgrade handler's computation.
fn connection_topics(queue: &Id, admin: bool, email: Option<&str>) -> Vec<String> {
    let mut set = vec![topics::generic(queue)];
    if admin {
        set.push(topics::admin(queue));
    } else {
        set.push(topics::non_privileged(queue));
    }
    if let Some(email) = email {
        set.push(topics::email(queue, email));
    }
    set
}

// ---------------------------------------------------------------------------
// Test: signup event matrix reaches the right audiences
// ---------------------------------------------------------------------------

#[tokio::test]
async fn signup_events_respect_visibility() {
    let bus = EventBus::default();
    let queue = Id::generate();

    let mut staff = bus.subscribe(connection_topics(&queue, true, Some("staff@x.edu")));
    let mut owner = bus.subscribe(connection_topics(&queue, false, Some("s@x.edu")));
    let mut other = bus.subscribe(connection_topics(&queue, false, Some("t@x.edu")));

    // The mutation service publishes the full entry to admins, the
    // anonymized entry to non-privileged viewers, and a full update to the
    // owner.
    let full = serde_json::json!({"id": "e1", "email": "s@x.edu", "description": "help"});
    let anon = serde_json::json!({"id": "e1"});

    bus.publish(&topics::admin(&queue), &WsEvent::new(names::ENTRY_CREATE, &full));
    bus.publish(
        &topics::non_privileged(&queue),
        &WsEvent::new(names::ENTRY_CREATE, &anon),
    );
    bus.publish(
        &topics::email(&queue, "s@x.edu"),
        &WsEvent::new(names::ENTRY_UPDATE, &full),
    );

    let staff_event = staff.receiver.recv().await.unwrap();
    assert_eq!(staff_event.event, names::ENTRY_CREATE);
    assert_eq!(staff_event.data["email"], "s@x.edu");

    // The owner sees the anonymized create plus its own full update.
    let owner_create = owner.receiver.recv().await.unwrap();
    assert_eq!(owner_create.event, names::ENTRY_CREATE);
    assert!(owner_create.data.get("email").is_none());
    let owner_update = owner.receiver.recv().await.unwrap();
    assert_eq!(owner_update.event, names::ENTRY_UPDATE);
    assert_eq!(owner_update.data["email"], "s@x.edu");

    // A different student sees only the anonymized create.
    let other_event = other.receiver.recv().await.unwrap();
    assert!(other_event.data.get("email").is_none());
    assert!(other.receiver.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: generic topic reaches every connection on the queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generic_topic_reaches_everyone() {
    let bus = EventBus::default();
    let queue = Id::generate();

    let mut staff = bus.subscribe(connection_topics(&queue, true, Some("staff@x.edu")));
    let mut student = bus.subscribe(connection_topics(&queue, false, None));

    bus.publish(&topics::generic(&queue), &WsEvent::new(names::QUEUE_OPEN, true));

    assert_eq!(staff.receiver.recv().await.unwrap().event, names::QUEUE_OPEN);
    assert_eq!(student.receiver.recv().await.unwrap().event, names::QUEUE_OPEN);
}

// ---------------------------------------------------------------------------
// Test: events stay inside their queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queues_are_isolated() {
    let bus = EventBus::default();
    let (q1, q2) = (Id::generate(), Id::generate());

    let mut on_q1 = bus.subscribe(connection_topics(&q1, false, None));

    bus.publish(&topics::generic(&q2), &WsEvent::new(names::REFRESH, ()));
    assert!(on_q1.receiver.try_recv().is_err());

    bus.publish(&topics::generic(&q1), &WsEvent::new(names::REFRESH, ()));
    assert_eq!(on_q1.receiver.recv().await.unwrap().event, names::REFRESH);
}

// ---------------------------------------------------------------------------
// Test: per-connection delivery order follows publish order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_order_is_preserved_across_a_connections_topics() {
    let bus = EventBus::default();
    let queue = Id::generate();

    let mut owner = bus.subscribe(connection_topics(&queue, false, Some("s@x.edu")));

    bus.publish(&topics::generic(&queue), &WsEvent::new("A", ()));
    bus.publish(&topics::email(&queue, "s@x.edu"), &WsEvent::new("B", ()));
    bus.publish(&topics::non_privileged(&queue), &WsEvent::new("C", ()));

    for expected in ["A", "B", "C"] {
        assert_eq!(owner.receiver.recv().await.unwrap().event, expected);
    }
}
