//! Announcement models.

use ohq_core::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `announcements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Announcement {
    pub id: Id,
    pub queue: Id,
    pub content: String,
}

/// Payload for posting an announcement.
#[derive(Debug, Deserialize)]
pub struct AnnouncementSubmission {
    pub content: String,
}
