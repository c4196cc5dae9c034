//! Queue and queue-configuration models.

use ohq_core::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Queue flavor. Only ordered queues carry the entry state machine;
/// appointment scheduling is a sibling feature outside this service's core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QueueType {
    #[default]
    Ordered,
    Appointments,
}

/// A row from the `queues` table (identity columns only; the configuration
/// columns of the same row are read separately as [`QueueConfiguration`]).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Queue {
    pub id: Id,
    pub course: Id,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub queue_type: QueueType,
    pub name: String,
    pub location: String,
    #[serde(skip_serializing)]
    pub active: bool,
}

/// Payload for creating or renaming a queue.
#[derive(Debug, Deserialize)]
pub struct QueueSubmission {
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "type", default)]
    pub queue_type: QueueType,
}

/// The configuration columns of a `queues` row (1:1 with the queue).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueConfiguration {
    pub id: Id,
    pub enable_location_field: bool,
    pub prevent_unregistered: bool,
    pub prevent_groups: bool,
    pub prevent_groups_boost: bool,
    pub prioritize_new: bool,
    /// Seconds a student must wait after being helped before signing up
    /// again. Zero disables the cooldown.
    pub cooldown: i32,
    #[sqlx(rename = "virtual")]
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    pub scheduled: bool,
    /// Ordered list of question strings, stored as JSON. Empty means the
    /// description is free text.
    pub prompts: serde_json::Value,
    pub manual_open: bool,
}

/// Payload for a configuration update. The manual-open flag has its own
/// endpoint and is not part of this shape.
#[derive(Debug, Deserialize)]
pub struct ConfigurationUpdate {
    pub enable_location_field: bool,
    pub prevent_unregistered: bool,
    pub prevent_groups: bool,
    pub prevent_groups_boost: bool,
    pub prioritize_new: bool,
    pub cooldown: i32,
    #[serde(rename = "virtual", default)]
    pub is_virtual: bool,
    pub scheduled: bool,
    #[serde(default = "empty_prompts")]
    pub prompts: serde_json::Value,
}

fn empty_prompts() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}
