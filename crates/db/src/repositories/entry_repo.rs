//! Repository for `queue_entries`: the entry state machine plus the policy
//! composition (`can_add`, `priority_for`) that runs inside the signup
//! transaction.

use chrono::{Datelike, Local, Utc};
use ohq_core::policy::{self, SignupDenial};
use ohq_core::{Id, Timestamp};
use sqlx::PgConnection;

use crate::models::entry::QueueEntry;
use crate::models::queue::QueueConfiguration;
use crate::repositories::{RosterRepo, ScheduleRepo};

const COLUMNS: &str = "\
    id, queue, email, name, location, description, priority, pinned, \
    helping, helped, active, removed_at, removed_by";

/// Display order for active entries; must agree with
/// `ohq_core::policy::DisplayKey::display_order`.
const DISPLAY_ORDER: &str = "pinned DESC, (helping <> '') DESC, priority DESC, id";

pub struct EntryRepo;

impl EntryRepo {
    pub async fn get(
        conn: &mut PgConnection,
        entry: &Id,
        allow_removed: bool,
    ) -> Result<Option<QueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM queue_entries WHERE id = $1 AND ($2 OR active IS NOT NULL)"
        );
        sqlx::query_as(&query)
            .bind(entry)
            .bind(allow_removed)
            .fetch_optional(conn)
            .await
    }

    /// Active entries in display order.
    pub async fn active_for_queue(
        conn: &mut PgConnection,
        queue: &Id,
    ) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM queue_entries \
             WHERE queue = $1 AND active IS NOT NULL ORDER BY {DISPLAY_ORDER}"
        );
        sqlx::query_as(&query).bind(queue).fetch_all(conn).await
    }

    pub async fn active_for_user(
        conn: &mut PgConnection,
        queue: &Id,
        email: &str,
    ) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM queue_entries \
             WHERE queue = $1 AND email = $2 AND active IS NOT NULL"
        );
        sqlx::query_as(&query)
            .bind(queue)
            .bind(email)
            .fetch_all(conn)
            .await
    }

    /// Archived entries, newest removal first.
    pub async fn stack(
        conn: &mut PgConnection,
        queue: &Id,
        limit: i64,
    ) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM queue_entries WHERE queue = $1 AND active IS NULL \
             ORDER BY removed_at DESC, id DESC LIMIT $2"
        );
        sqlx::query_as(&query)
            .bind(queue)
            .bind(limit)
            .fetch_all(conn)
            .await
    }

    /// Insert a new active entry. The partial unique index on
    /// `(queue, email) WHERE active IS NOT NULL` turns a concurrent double
    /// signup into a unique violation for the losing writer.
    pub async fn insert(
        conn: &mut PgConnection,
        queue: &Id,
        email: &str,
        name: &str,
        location: &str,
        description: &str,
        priority: i32,
    ) -> Result<QueueEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_entries \
                 (id, queue, email, name, location, description, priority, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as(&query)
            .bind(Id::generate())
            .bind(queue)
            .bind(email)
            .bind(name)
            .bind(location)
            .bind(description)
            .bind(priority)
            .fetch_one(conn)
            .await
    }

    /// Owner edit: content fields only; priority, pinned and helping are
    /// untouched.
    pub async fn update_details(
        conn: &mut PgConnection,
        entry: &Id,
        name: &str,
        location: &str,
        description: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queue_entries SET name = $1, location = $2, description = $3 \
             WHERE id = $4 AND active IS NOT NULL",
        )
        .bind(name)
        .bind(location)
        .bind(description)
        .bind(entry)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Archive an active entry, marking it helped. Returns `None` when the
    /// entry was already archived by someone else.
    pub async fn archive(
        conn: &mut PgConnection,
        entry: &Id,
        remover: &str,
    ) -> Result<Option<QueueEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE queue_entries SET pinned = FALSE, active = NULL, helping = '', \
                 removed_at = NOW(), removed_by = $1, helped = TRUE \
             WHERE active IS NOT NULL AND id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as(&query)
            .bind(remover)
            .bind(entry)
            .fetch_optional(conn)
            .await
    }

    /// Resurrect an archived entry at the top of the queue (also used to pin
    /// an already-active entry).
    pub async fn pin(conn: &mut PgConnection, entry: &Id) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queue_entries SET active = TRUE, removed_at = NULL, removed_by = NULL, \
                 helped = FALSE, pinned = TRUE \
             WHERE id = $1",
        )
        .bind(entry)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn set_helping(
        conn: &mut PgConnection,
        entry: &Id,
        helping: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE queue_entries SET helping = $1 WHERE id = $2")
            .bind(helping)
            .bind(entry)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_helped(
        conn: &mut PgConnection,
        entry: &Id,
        helped: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE queue_entries SET helped = $1 WHERE id = $2")
            .bind(helped)
            .bind(entry)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Assign every active entry a uniform random priority in 1..=10.
    pub async fn randomize(conn: &mut PgConnection, queue: &Id) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queue_entries SET priority = floor(random() * 10 + 1)::int \
             WHERE active IS NOT NULL AND queue = $1",
        )
        .bind(queue)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Archive every active entry at once. Cleared entries do not count as
    /// helped.
    pub async fn clear(
        conn: &mut PgConnection,
        queue: &Id,
        remover: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE queue_entries SET active = NULL, removed_at = NOW(), removed_by = $1, \
                 pinned = FALSE, helping = '', helped = FALSE \
             WHERE active IS NOT NULL AND queue = $2",
        )
        .bind(remover)
        .bind(queue)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// When this student was last helped on this queue: the latest removal
    /// by someone other than themselves that was marked helped.
    pub async fn last_helped_time(
        conn: &mut PgConnection,
        queue: &Id,
        email: &str,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT MAX(removed_at) FROM queue_entries \
             WHERE email = $1 AND queue = $2 AND active IS NULL \
               AND removed_by != email AND helped",
        )
        .bind(email)
        .bind(queue)
        .fetch_one(conn)
        .await
    }

    /// Eligibility to sign up, for non-admin students. `None` means
    /// eligible; the first failing rule wins.
    pub async fn can_add(
        conn: &mut PgConnection,
        queue: &Id,
        config: &QueueConfiguration,
        email: &str,
    ) -> Result<Option<SignupDenial>, sqlx::Error> {
        let now = Local::now();
        let today = ScheduleRepo::for_day(
            conn,
            queue,
            now.weekday().num_days_from_sunday() as i32,
        )
        .await?
        .unwrap_or_default();

        let half_hour = policy::current_half_hour(now);
        if !policy::is_open(config.scheduled, config.manual_open, &today, half_hour) {
            return Ok(Some(SignupDenial::Closed));
        }

        if config.prevent_unregistered && !RosterRepo::contains(conn, queue, email).await? {
            return Ok(Some(SignupDenial::NotOnRoster));
        }

        if config.prevent_groups && RosterRepo::teammate_in_queue(conn, queue, email).await? {
            return Ok(Some(SignupDenial::TeammateInQueue));
        }

        if let Some(last) = Self::last_helped_time(conn, queue, email).await? {
            let remaining =
                policy::cooldown_remaining(last, i64::from(config.cooldown), Utc::now());
            if let Some(remaining_seconds) = remaining {
                return Ok(Some(SignupDenial::Cooldown { remaining_seconds }));
            }
        }

        Ok(None)
    }

    /// Priority for a new entry by this student, using the id's timestamp
    /// prefix to bound the "today" scan on the `(queue, id)` index.
    pub async fn priority_for(
        conn: &mut PgConnection,
        queue: &Id,
        config: &QueueConfiguration,
        email: &str,
    ) -> Result<i32, sqlx::Error> {
        if !config.prioritize_new {
            return Ok(0);
        }

        let first_id_of_day = Id::start_of_local_day(Local::now());

        let personal: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_entries \
             WHERE email = $1 AND queue = $2 AND id >= $3 \
               AND removed_by != email AND helped",
        )
        .bind(email)
        .bind(queue)
        .bind(&first_id_of_day)
        .fetch_one(&mut *conn)
        .await?;

        let teammates: i64 = if config.prevent_groups_boost {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM queue_entries e \
                 JOIN teammates t ON e.email = t.teammate AND e.queue = t.queue \
                 WHERE t.email = $1 AND e.queue = $2 AND e.id >= $3 \
                   AND e.removed_by != e.email AND e.helped",
            )
            .bind(email)
            .bind(queue)
            .bind(&first_id_of_day)
            .fetch_one(conn)
            .await?
        } else {
            0
        };

        Ok(policy::new_entry_priority(
            config.prioritize_new,
            personal > 0,
            teammates > 0,
        ))
    }
}
