//! Queue entry model and its serialization projections.
//!
//! The same row is serialized in three shapes: the full entry (admins and
//! the entry's owner), the anonymized entry (everyone else on the queue),
//! and the removed entry (the admin stack). The mutation service picks the
//! projection per topic when publishing events.

use ohq_core::policy::DisplayKey;
use ohq_core::{Id, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The `helping` text non-privileged viewers see while an entry is served.
pub const HELPING_REDACTED: &str = " staff";

/// A row from the `queue_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueEntry {
    pub id: Id,
    pub queue: Id,
    pub email: String,
    pub name: String,
    pub location: String,
    pub description: String,
    pub priority: i32,
    pub pinned: bool,
    /// `" <first name>"` while a staff member is helping, else empty.
    pub helping: String,
    #[serde(skip_serializing)]
    pub helped: bool,
    /// Sentinel: `Some(true)` while on the queue, `None` once archived.
    #[serde(skip_serializing)]
    pub active: Option<bool>,
    #[serde(skip_serializing)]
    pub removed_at: Option<Timestamp>,
    #[serde(skip_serializing)]
    pub removed_by: Option<String>,
}

impl QueueEntry {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The projection published to non-privileged viewers: identity and
    /// content fields are stripped and the helper's name collapses to
    /// [`HELPING_REDACTED`].
    pub fn anonymized(&self) -> AnonymizedEntry {
        AnonymizedEntry {
            id: self.id.clone(),
            queue: self.queue.clone(),
            priority: self.priority,
            pinned: self.pinned,
            helping: if self.helping.is_empty() {
                String::new()
            } else {
                HELPING_REDACTED.to_string()
            },
        }
    }

    /// The projection used for the admin stack and removed-entry payloads.
    pub fn removed(&self) -> RemovedEntry {
        RemovedEntry {
            id: self.id.clone(),
            queue: self.queue.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            priority: self.priority,
            pinned: self.pinned,
            helping: self.helping.clone(),
            helped: self.helped,
            removed_at: self.removed_at,
            removed_by: self.removed_by.clone(),
        }
    }

    pub fn display_key(&self) -> DisplayKey {
        DisplayKey {
            pinned: self.pinned,
            being_helped: !self.helping.is_empty(),
            priority: self.priority,
            id: self.id.clone(),
        }
    }
}

/// Redacted entry shape for non-privileged viewers.
#[derive(Debug, Clone, Serialize)]
pub struct AnonymizedEntry {
    pub id: Id,
    pub queue: Id,
    pub priority: i32,
    pub pinned: bool,
    pub helping: String,
}

/// Archived entry shape, including removal metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedEntry {
    pub id: Id,
    pub queue: Id,
    pub email: String,
    pub name: String,
    pub location: String,
    pub description: String,
    pub priority: i32,
    pub pinned: bool,
    pub helping: String,
    pub helped: bool,
    pub removed_at: Option<Timestamp>,
    pub removed_by: Option<String>,
}

/// Payload for signing up or editing an entry. Identity comes from the
/// session, never from the body.
#[derive(Debug, Deserialize)]
pub struct EntrySubmission {
    pub description: String,
    #[serde(default)]
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(helping: &str) -> QueueEntry {
        QueueEntry {
            id: Id::generate(),
            queue: Id::generate(),
            email: "s@x.edu".to_string(),
            name: "Student".to_string(),
            location: "desk 4".to_string(),
            description: "borrow checker".to_string(),
            priority: 1,
            pinned: false,
            helping: helping.to_string(),
            helped: false,
            active: Some(true),
            removed_at: None,
            removed_by: None,
        }
    }

    #[test]
    fn anonymized_strips_identity_and_content() {
        let json = serde_json::to_value(entry("").anonymized()).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("name").is_none());
        assert!(json.get("description").is_none());
        assert!(json.get("location").is_none());
    }

    #[test]
    fn anonymized_collapses_the_helper_name() {
        assert_eq!(entry(" Alice").anonymized().helping, HELPING_REDACTED);
        assert_eq!(entry("").anonymized().helping, "");
    }

    #[test]
    fn full_serialization_hides_removal_bookkeeping() {
        let json = serde_json::to_value(entry("")).unwrap();
        assert!(json.get("email").is_some());
        assert!(json.get("removed_at").is_none());
        assert!(json.get("removed_by").is_none());
        assert!(json.get("helped").is_none());
    }

    #[test]
    fn removed_projection_exposes_removal_bookkeeping() {
        let mut e = entry("");
        e.active = None;
        e.helped = true;
        e.removed_by = Some("staff@x.edu".to_string());
        let json = serde_json::to_value(e.removed()).unwrap();
        assert_eq!(json["helped"], true);
        assert_eq!(json["removed_by"], "staff@x.edu");
    }
}
