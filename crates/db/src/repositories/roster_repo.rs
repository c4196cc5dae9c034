//! Repository for `roster`, `groups`, and the `teammates` view.

use ohq_core::Id;
use sqlx::PgConnection;

pub struct RosterRepo;

impl RosterRepo {
    pub async fn emails(conn: &mut PgConnection, queue: &Id) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT email FROM roster WHERE queue = $1 ORDER BY email")
            .bind(queue)
            .fetch_all(conn)
            .await
    }

    pub async fn contains(
        conn: &mut PgConnection,
        queue: &Id,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM roster WHERE queue = $1 AND email = $2")
                .bind(queue)
                .bind(email)
                .fetch_one(conn)
                .await?;
        Ok(count > 0)
    }

    /// Replace the roster wholesale (delete-then-insert, caller's
    /// transaction makes it atomic).
    pub async fn replace(
        conn: &mut PgConnection,
        queue: &Id,
        emails: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM roster WHERE queue = $1")
            .bind(queue)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            "INSERT INTO roster (queue, email) \
             SELECT $1, unnest($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(queue)
        .bind(emails)
        .execute(conn)
        .await?;
        Ok(())
    }

    // -- Groups -------------------------------------------------------------

    /// Groups as lists of member emails, in stable group order.
    pub async fn groups(
        conn: &mut PgConnection,
        queue: &Id,
    ) -> Result<Vec<Vec<String>>, sqlx::Error> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT group_id, email FROM groups WHERE queue = $1 ORDER BY group_id, email",
        )
        .bind(queue)
        .fetch_all(conn)
        .await?;

        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut current_id: Option<String> = None;
        for (group_id, email) in rows {
            if current_id.as_deref() != Some(group_id.as_str()) {
                groups.push(Vec::new());
                current_id = Some(group_id);
            }
            if let Some(group) = groups.last_mut() {
                group.push(email);
            }
        }
        Ok(groups)
    }

    /// Replace all groups wholesale; each uploaded group gets a fresh id.
    pub async fn replace_groups(
        conn: &mut PgConnection,
        queue: &Id,
        groups: &[Vec<String>],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM groups WHERE queue = $1")
            .bind(queue)
            .execute(&mut *conn)
            .await?;

        let mut group_ids = Vec::new();
        let mut emails = Vec::new();
        for group in groups {
            let group_id = Id::generate();
            for email in group {
                group_ids.push(group_id.to_string());
                emails.push(email.clone());
            }
        }

        sqlx::query(
            "INSERT INTO groups (queue, group_id, email) \
             SELECT $1, g, e FROM unnest($2::text[], $3::text[]) AS members (g, e)",
        )
        .bind(queue)
        .bind(&group_ids)
        .bind(&emails)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Whether any teammate of `email` currently has an active entry.
    pub async fn teammate_in_queue(
        conn: &mut PgConnection,
        queue: &Id,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_entries e \
             JOIN teammates t ON e.email = t.teammate \
             WHERE t.queue = $1 AND t.email = $2 AND e.queue = $1 AND e.active IS NOT NULL",
        )
        .bind(queue)
        .bind(email)
        .fetch_one(conn)
        .await?;
        Ok(count > 0)
    }
}
