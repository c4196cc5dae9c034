//! Repository for the per-weekday `schedules` rows.
//!
//! Each queue has seven rows keyed 0 (Sunday) through 6, each a 48-slot
//! half-hour string.

use ohq_core::policy::HALF_HOURS_PER_DAY;
use ohq_core::Id;
use sqlx::PgConnection;

pub struct ScheduleRepo;

impl ScheduleRepo {
    /// All seven day strings in weekday order.
    pub async fn week(conn: &mut PgConnection, queue: &Id) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT schedule FROM schedules WHERE queue = $1 ORDER BY day")
            .bind(queue)
            .fetch_all(conn)
            .await
    }

    pub async fn for_day(
        conn: &mut PgConnection,
        queue: &Id,
        day: i32,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT schedule FROM schedules WHERE queue = $1 AND day = $2")
            .bind(queue)
            .bind(day)
            .fetch_optional(conn)
            .await
    }

    /// Insert the all-closed week for a newly created queue.
    pub async fn seed_closed_week(
        conn: &mut PgConnection,
        queue: &Id,
    ) -> Result<(), sqlx::Error> {
        let closed = "c".repeat(HALF_HOURS_PER_DAY);
        for day in 0..7i32 {
            sqlx::query("INSERT INTO schedules (queue, day, schedule) VALUES ($1, $2, $3)")
                .bind(queue)
                .bind(day)
                .bind(&closed)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Overwrite the week, one row per day.
    pub async fn replace_week(
        conn: &mut PgConnection,
        queue: &Id,
        days: &[String],
    ) -> Result<(), sqlx::Error> {
        for (day, schedule) in days.iter().enumerate() {
            sqlx::query("UPDATE schedules SET schedule = $1 WHERE queue = $2 AND day = $3")
                .bind(schedule)
                .bind(queue)
                .bind(day as i32)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}
