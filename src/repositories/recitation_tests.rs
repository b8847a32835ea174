use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::db::models::Test;
use crate::db::types::TestStatus;

pub(crate) const COLUMNS: &str = "\
    id, class_id, student_id, status, started_at, completed_at, total_score, max_score, \
    created_at, updated_at";

pub(crate) async fn create(
    conn: &mut PgConnection,
    class_id: i64,
    student_id: i64,
    now: PrimitiveDateTime,
) -> Result<Test, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "INSERT INTO tests (class_id, student_id, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(class_id)
    .bind(student_id)
    .bind(TestStatus::NotStarted)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {COLUMNS} FROM tests WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_class(
    executor: impl sqlx::PgExecutor<'_>,
    class_id: i64,
) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {COLUMNS} FROM tests WHERE class_id = $1"))
        .bind(class_id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the test for the rest of the transaction.
pub(crate) async fn lock_by_id(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {COLUMNS} FROM tests WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub(crate) async fn mark_started(
    conn: &mut PgConnection,
    id: i64,
    now: PrimitiveDateTime,
) -> Result<Test, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "UPDATE tests SET status = $2, started_at = $3, updated_at = $3
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(TestStatus::InProgress)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub(crate) async fn mark_completed(
    conn: &mut PgConnection,
    id: i64,
    total_score: f64,
    now: PrimitiveDateTime,
) -> Result<Test, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "UPDATE tests SET status = $2, completed_at = $3, total_score = $4, updated_at = $3
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(TestStatus::Completed)
    .bind(now)
    .bind(total_score)
    .fetch_one(conn)
    .await
}
