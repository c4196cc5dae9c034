//! Process-wide presence counters.
//!
//! Two maps live under one lock: the total connection count per queue and
//! the per-user connection count per queue. They must stay consistent with
//! each other and with the events derived from them, so both mutate inside
//! a single critical section and each transition returns the snapshot the
//! caller publishes after releasing the lock.

use std::collections::HashMap;
use std::sync::Mutex;

use ohq_core::Id;

#[derive(Default)]
struct Inner {
    connections: HashMap<Id, usize>,
    by_email: HashMap<Id, HashMap<String, usize>>,
}

/// Snapshot returned by [`Presence::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOpened {
    /// Queue connection count after the open.
    pub connections: usize,
    /// The user's count went 0 → 1, so an online event is due.
    pub first_for_email: bool,
}

/// Snapshot returned by [`Presence::disconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionClosed {
    pub connections: usize,
    /// The user's count went 1 → 0, so an offline event is due.
    pub last_for_email: bool,
}

#[derive(Default)]
pub struct Presence {
    inner: Mutex<Inner>,
}

impl Presence {
    pub fn connect(&self, queue: &Id, email: Option<&str>) -> ConnectionOpened {
        let mut inner = self.inner.lock().expect("presence lock poisoned");

        let connections = {
            let count = inner.connections.entry(queue.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let mut first_for_email = false;
        if let Some(email) = email {
            let counts = inner.by_email.entry(queue.clone()).or_default();
            let count = counts.entry(email.to_string()).or_insert(0);
            first_for_email = *count == 0;
            *count += 1;
        }

        ConnectionOpened {
            connections,
            first_for_email,
        }
    }

    pub fn disconnect(&self, queue: &Id, email: Option<&str>) -> ConnectionClosed {
        let mut inner = self.inner.lock().expect("presence lock poisoned");

        let connections = match inner.connections.get_mut(queue) {
            Some(count) => {
                *count = count.saturating_sub(1);
                let remaining = *count;
                if remaining == 0 {
                    inner.connections.remove(queue);
                }
                remaining
            }
            None => 0,
        };

        let mut last_for_email = false;
        if let Some(email) = email {
            if let Some(counts) = inner.by_email.get_mut(queue) {
                if let Some(count) = counts.get_mut(email) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        counts.remove(email);
                        last_for_email = true;
                    }
                }
                if counts.is_empty() {
                    inner.by_email.remove(queue);
                }
            }
        }

        ConnectionClosed {
            connections,
            last_for_email,
        }
    }

    /// Emails with at least one open connection to the queue, for the admin
    /// snapshot.
    pub fn online_emails(&self, queue: &Id) -> Vec<String> {
        let inner = self.inner.lock().expect("presence lock poisoned");
        let mut emails: Vec<String> = inner
            .by_email
            .get(queue)
            .map(|counts| counts.keys().cloned().collect())
            .unwrap_or_default();
        emails.sort();
        emails
    }

    pub fn connection_count(&self, queue: &Id) -> usize {
        let inner = self.inner.lock().expect("presence lock poisoned");
        inner.connections.get(queue).copied().unwrap_or(0)
    }
}
