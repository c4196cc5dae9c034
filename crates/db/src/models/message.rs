//! Direct/broadcast messages.
//!
//! Messages are ephemeral: they are assigned an id, redacted, fanned out on
//! the event bus, and never persisted.

use ohq_core::Id;
use serde::{Deserialize, Serialize};

/// Receiver value that fans a message out to the whole queue.
pub const BROADCAST_RECEIVER: &str = "<broadcast>";

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Id,
    pub queue: Id,
    /// Always redacted to empty before fan-out.
    pub sender: String,
    pub receiver: String,
    pub content: String,
}

/// Payload for sending a message.
#[derive(Debug, Deserialize)]
pub struct MessageSubmission {
    pub receiver: String,
    pub content: String,
}
