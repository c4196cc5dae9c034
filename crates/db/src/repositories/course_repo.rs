//! Repository for `courses` and `course_admins`.

use ohq_core::Id;
use sqlx::PgConnection;

use crate::models::course::{Course, CourseSubmission};

const COLUMNS: &str = "id, short_name, full_name, active";

pub struct CourseRepo;

impl CourseRepo {
    pub async fn list(conn: &mut PgConnection) -> Result<Vec<Course>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM courses WHERE active ORDER BY id");
        sqlx::query_as(&query).fetch_all(conn).await
    }

    pub async fn get(conn: &mut PgConnection, id: &Id) -> Result<Option<Course>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM courses WHERE active AND id = $1");
        sqlx::query_as(&query).bind(id).fetch_optional(conn).await
    }

    pub async fn create(
        conn: &mut PgConnection,
        input: &CourseSubmission,
    ) -> Result<Course, sqlx::Error> {
        let query = format!(
            "INSERT INTO courses (id, short_name, full_name) VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as(&query)
            .bind(Id::generate())
            .bind(&input.short_name)
            .bind(&input.full_name)
            .fetch_one(conn)
            .await
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: &Id,
        input: &CourseSubmission,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE courses SET short_name = $1, full_name = $2 WHERE active AND id = $3",
        )
        .bind(&input.short_name)
        .bind(&input.full_name)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn soft_delete(conn: &mut PgConnection, id: &Id) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE courses SET active = FALSE WHERE active AND id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Course admins ------------------------------------------------------

    pub async fn admins(conn: &mut PgConnection, course: &Id) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT email FROM course_admins WHERE course = $1 ORDER BY email")
            .bind(course)
            .fetch_all(conn)
            .await
    }

    pub async fn add_admins(
        conn: &mut PgConnection,
        course: &Id,
        emails: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO course_admins (course, email) \
             SELECT $1, unnest($2::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(course)
        .bind(emails)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Replace the full admin set of a course.
    pub async fn set_admins(
        conn: &mut PgConnection,
        course: &Id,
        emails: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM course_admins WHERE course = $1")
            .bind(course)
            .execute(&mut *conn)
            .await?;
        Self::add_admins(conn, course, emails).await
    }

    pub async fn remove_admins(
        conn: &mut PgConnection,
        course: &Id,
        emails: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM course_admins WHERE course = $1 AND email = ANY($2::text[])")
            .bind(course)
            .bind(emails)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Ids of the courses this email administers.
    pub async fn admin_courses(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Vec<Id>, sqlx::Error> {
        sqlx::query_scalar("SELECT course FROM course_admins WHERE email = $1 ORDER BY course")
            .bind(email)
            .fetch_all(conn)
            .await
    }
}
