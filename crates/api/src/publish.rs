//! Commit-gated event publication.
//!
//! Mutation handlers collect their events in a [`PendingEvents`] buffer
//! while working inside the request transaction, then hand the transaction
//! and the buffer to [`PendingEvents::commit`] together. Events reach the
//! bus only after the commit succeeds, so no subscriber ever observes a
//! state change that is later rolled back; a handler error drops the
//! transaction (rolling it back) and the buffer with it.

use ohq_events::{EventBus, WsEvent};
use sqlx::{Postgres, Transaction};

#[derive(Default)]
pub struct PendingEvents {
    events: Vec<(String, WsEvent)>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for publication after commit.
    pub fn push(&mut self, topic: String, event: WsEvent) {
        self.events.push((topic, event));
    }

    /// Commit the transaction, then flush every queued event in order.
    pub async fn commit(
        self,
        tx: Transaction<'_, Postgres>,
        bus: &EventBus,
    ) -> Result<(), sqlx::Error> {
        tx.commit().await?;
        for (topic, event) in self.events {
            bus.publish(&topic, &event);
        }
        Ok(())
    }
}
