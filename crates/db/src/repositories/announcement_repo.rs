//! Repository for `announcements`.

use ohq_core::Id;
use sqlx::PgConnection;

use crate::models::announcement::Announcement;

pub struct AnnouncementRepo;

impl AnnouncementRepo {
    pub async fn for_queue(
        conn: &mut PgConnection,
        queue: &Id,
    ) -> Result<Vec<Announcement>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, queue, content FROM announcements WHERE queue = $1 ORDER BY id",
        )
        .bind(queue)
        .fetch_all(conn)
        .await
    }

    pub async fn create(
        conn: &mut PgConnection,
        queue: &Id,
        content: &str,
    ) -> Result<Announcement, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO announcements (id, queue, content) VALUES ($1, $2, $3) \
             RETURNING id, queue, content",
        )
        .bind(Id::generate())
        .bind(queue)
        .bind(content)
        .fetch_one(conn)
        .await
    }

    pub async fn delete(
        conn: &mut PgConnection,
        queue: &Id,
        announcement: &Id,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1 AND queue = $2")
            .bind(announcement)
            .bind(queue)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
