//! Course entity models.

use ohq_core::Id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `courses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: Id,
    pub short_name: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub active: bool,
}

/// Payload for creating or updating a course.
#[derive(Debug, Deserialize)]
pub struct CourseSubmission {
    pub short_name: String,
    pub full_name: String,
}
