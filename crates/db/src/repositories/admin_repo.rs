//! Repository for the capability tables.
//!
//! Site-admin status can come from the identity provider (group claims
//! checked by the caller against configuration) or from the `site_admins`
//! table; course-admin status from either of those or a `course_admins` row.

use ohq_core::Id;
use sqlx::PgConnection;

pub struct AdminRepo;

impl AdminRepo {
    /// Whether this email appears in the `site_admins` table.
    pub async fn in_site_admins(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM site_admins WHERE email = $1")
                .bind(email)
                .fetch_one(conn)
                .await?;
        Ok(count > 0)
    }

    /// Whether this email has a `course_admins` row for the course.
    pub async fn is_course_admin(
        conn: &mut PgConnection,
        course: &Id,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM course_admins WHERE course = $1 AND email = $2",
        )
        .bind(course)
        .bind(email)
        .fetch_one(conn)
        .await?;
        Ok(count > 0)
    }
}
