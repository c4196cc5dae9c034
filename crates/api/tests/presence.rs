//! Presence counter tests.
//!
//! The invariant: `count_by_email[Q][e]` equals the number of open
//! connections of `e` to `Q` under any interleaving, and the online/offline
//! transitions fire exactly on the 0↔1 crossings.

use ohq_api::ws::Presence;
use ohq_core::Id;

#[test]
fn first_connection_is_an_online_transition() {
    let presence = Presence::default();
    let queue = Id::generate();

    let opened = presence.connect(&queue, Some("s@x.edu"));
    assert_eq!(opened.connections, 1);
    assert!(opened.first_for_email);
}

#[test]
fn second_connection_of_the_same_user_is_not_a_transition() {
    let presence = Presence::default();
    let queue = Id::generate();

    presence.connect(&queue, Some("s@x.edu"));
    let opened = presence.connect(&queue, Some("s@x.edu"));
    assert_eq!(opened.connections, 2);
    assert!(!opened.first_for_email);
}

#[test]
fn offline_fires_only_when_the_last_connection_closes() {
    let presence = Presence::default();
    let queue = Id::generate();

    presence.connect(&queue, Some("s@x.edu"));
    presence.connect(&queue, Some("s@x.edu"));

    let closed = presence.disconnect(&queue, Some("s@x.edu"));
    assert_eq!(closed.connections, 1);
    assert!(!closed.last_for_email);

    let closed = presence.disconnect(&queue, Some("s@x.edu"));
    assert_eq!(closed.connections, 0);
    assert!(closed.last_for_email);
}

#[test]
fn anonymous_connections_count_but_never_transition() {
    let presence = Presence::default();
    let queue = Id::generate();

    let opened = presence.connect(&queue, None);
    assert_eq!(opened.connections, 1);
    assert!(!opened.first_for_email);

    let closed = presence.disconnect(&queue, None);
    assert_eq!(closed.connections, 0);
    assert!(!closed.last_for_email);
}

#[test]
fn queues_are_counted_independently() {
    let presence = Presence::default();
    let (q1, q2) = (Id::generate(), Id::generate());

    presence.connect(&q1, Some("s@x.edu"));
    let opened = presence.connect(&q2, Some("s@x.edu"));

    assert_eq!(opened.connections, 1);
    assert!(opened.first_for_email, "presence is per queue, not global");
    assert_eq!(presence.connection_count(&q1), 1);
    assert_eq!(presence.connection_count(&q2), 1);
}

#[test]
fn online_emails_reflects_current_connections() {
    let presence = Presence::default();
    let queue = Id::generate();

    presence.connect(&queue, Some("b@x.edu"));
    presence.connect(&queue, Some("a@x.edu"));
    presence.connect(&queue, None);

    assert_eq!(presence.online_emails(&queue), vec!["a@x.edu", "b@x.edu"]);

    presence.disconnect(&queue, Some("a@x.edu"));
    assert_eq!(presence.online_emails(&queue), vec!["b@x.edu"]);
}

#[test]
fn interleaved_connects_and_disconnects_keep_counts_exact() {
    let presence = Presence::default();
    let queue = Id::generate();

    // Two users, overlapping sessions.
    presence.connect(&queue, Some("a@x.edu"));
    presence.connect(&queue, Some("b@x.edu"));
    presence.connect(&queue, Some("a@x.edu"));

    assert_eq!(presence.connection_count(&queue), 3);

    let closed = presence.disconnect(&queue, Some("a@x.edu"));
    assert!(!closed.last_for_email, "a still has one connection");

    let closed = presence.disconnect(&queue, Some("b@x.edu"));
    assert!(closed.last_for_email);

    let closed = presence.disconnect(&queue, Some("a@x.edu"));
    assert!(closed.last_for_email);
    assert_eq!(presence.connection_count(&queue), 0);
    assert!(presence.online_emails(&queue).is_empty());
}

#[test]
fn disconnect_without_connect_is_harmless() {
    let presence = Presence::default();
    let queue = Id::generate();

    let closed = presence.disconnect(&queue, Some("ghost@x.edu"));
    assert_eq!(closed.connections, 0);
    assert!(!closed.last_for_email);
}
