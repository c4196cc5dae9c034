//! Repository for `queues` rows: identity columns and the configuration
//! projection of the same row.

use ohq_core::Id;
use sqlx::PgConnection;

use crate::models::queue::{ConfigurationUpdate, Queue, QueueConfiguration, QueueSubmission};
use crate::repositories::ScheduleRepo;

const COLUMNS: &str = "id, course, type, name, location, active";

const CONFIG_COLUMNS: &str = "\
    id, enable_location_field, prevent_unregistered, prevent_groups, \
    prevent_groups_boost, prioritize_new, cooldown, virtual, scheduled, \
    prompts, manual_open";

pub struct QueueRepo;

impl QueueRepo {
    pub async fn get(conn: &mut PgConnection, id: &Id) -> Result<Option<Queue>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queues WHERE active AND id = $1");
        sqlx::query_as(&query).bind(id).fetch_optional(conn).await
    }

    pub async fn for_course(
        conn: &mut PgConnection,
        course: &Id,
    ) -> Result<Vec<Queue>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queues WHERE active AND course = $1 ORDER BY id");
        sqlx::query_as(&query).bind(course).fetch_all(conn).await
    }

    /// Create a queue with default configuration and an all-closed schedule.
    pub async fn create(
        conn: &mut PgConnection,
        course: &Id,
        input: &QueueSubmission,
    ) -> Result<Queue, sqlx::Error> {
        let query = format!(
            "INSERT INTO queues (id, course, type, name, location) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        let queue: Queue = sqlx::query_as(&query)
            .bind(Id::generate())
            .bind(course)
            .bind(input.queue_type)
            .bind(&input.name)
            .bind(&input.location)
            .fetch_one(&mut *conn)
            .await?;

        ScheduleRepo::seed_closed_week(conn, &queue.id).await?;
        Ok(queue)
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: &Id,
        name: &str,
        location: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE queues SET name = $1, location = $2 WHERE active AND id = $3")
                .bind(name)
                .bind(location)
                .bind(id)
                .execute(conn)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn soft_delete(conn: &mut PgConnection, id: &Id) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE queues SET active = FALSE WHERE active AND id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Configuration ------------------------------------------------------

    pub async fn configuration(
        conn: &mut PgConnection,
        id: &Id,
    ) -> Result<Option<QueueConfiguration>, sqlx::Error> {
        let query = format!("SELECT {CONFIG_COLUMNS} FROM queues WHERE id = $1");
        sqlx::query_as(&query).bind(id).fetch_optional(conn).await
    }

    pub async fn update_configuration(
        conn: &mut PgConnection,
        id: &Id,
        config: &ConfigurationUpdate,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queues SET enable_location_field = $1, prevent_unregistered = $2, \
             prevent_groups = $3, prevent_groups_boost = $4, prioritize_new = $5, \
             cooldown = $6, virtual = $7, scheduled = $8, prompts = $9 \
             WHERE active AND id = $10",
        )
        .bind(config.enable_location_field)
        .bind(config.prevent_unregistered)
        .bind(config.prevent_groups)
        .bind(config.prevent_groups_boost)
        .bind(config.prioritize_new)
        .bind(config.cooldown)
        .bind(config.is_virtual)
        .bind(config.scheduled)
        .bind(&config.prompts)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_manual_open(
        conn: &mut PgConnection,
        id: &Id,
        open: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE queues SET manual_open = $1 WHERE active AND id = $2")
            .bind(open)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
