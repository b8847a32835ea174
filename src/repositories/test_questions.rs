use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::db::models::TestQuestion;
use crate::db::types::QuestionStatus;

pub(crate) const COLUMNS: &str = "\
    id, test_id, question_number, start_surah, start_ayah, end_surah, end_ayah, \
    deductions, status, started_at, completed_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<TestQuestion>, sqlx::Error> {
    sqlx::query_as::<_, TestQuestion>(&format!(
        "SELECT {COLUMNS} FROM test_questions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn lock_by_id(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<TestQuestion>, sqlx::Error> {
    sqlx::query_as::<_, TestQuestion>(&format!(
        "SELECT {COLUMNS} FROM test_questions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn list_by_test(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: i64,
) -> Result<Vec<TestQuestion>, sqlx::Error> {
    sqlx::query_as::<_, TestQuestion>(&format!(
        "SELECT {COLUMNS} FROM test_questions WHERE test_id = $1 ORDER BY question_number"
    ))
    .bind(test_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_active_id(
    conn: &mut PgConnection,
    test_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM test_questions WHERE test_id = $1 AND status = $2")
        .bind(test_id)
        .bind(QuestionStatus::InProgress)
        .fetch_optional(conn)
        .await
}

/// Numbers keep growing past cancelled questions.
pub(crate) async fn next_number(conn: &mut PgConnection, test_id: i64) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(MAX(question_number), 0) + 1 FROM test_questions WHERE test_id = $1",
    )
    .bind(test_id)
    .fetch_one(conn)
    .await
}

pub(crate) struct CreateQuestion {
    pub(crate) test_id: i64,
    pub(crate) question_number: i32,
    pub(crate) start_surah: i32,
    pub(crate) start_ayah: i32,
    pub(crate) started_at: PrimitiveDateTime,
}

pub(crate) async fn create_in_progress(
    conn: &mut PgConnection,
    question: CreateQuestion,
) -> Result<TestQuestion, sqlx::Error> {
    sqlx::query_as::<_, TestQuestion>(&format!(
        "INSERT INTO test_questions (
            test_id, question_number, start_surah, start_ayah, deductions, status, started_at
        ) VALUES ($1, $2, $3, $4, 0, $5, $6)
        RETURNING {COLUMNS}"
    ))
    .bind(question.test_id)
    .bind(question.question_number)
    .bind(question.start_surah)
    .bind(question.start_ayah)
    .bind(QuestionStatus::InProgress)
    .bind(question.started_at)
    .fetch_one(conn)
    .await
}

pub(crate) async fn mark_completed(
    conn: &mut PgConnection,
    id: i64,
    end_surah: i32,
    end_ayah: i32,
    deductions: f64,
    now: PrimitiveDateTime,
) -> Result<TestQuestion, sqlx::Error> {
    sqlx::query_as::<_, TestQuestion>(&format!(
        "UPDATE test_questions
         SET status = $2, end_surah = $3, end_ayah = $4, deductions = $5, completed_at = $6
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(QuestionStatus::Completed)
    .bind(end_surah)
    .bind(end_ayah)
    .bind(deductions)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub(crate) async fn mark_cancelled(
    conn: &mut PgConnection,
    id: i64,
    now: PrimitiveDateTime,
) -> Result<TestQuestion, sqlx::Error> {
    sqlx::query_as::<_, TestQuestion>(&format!(
        "UPDATE test_questions SET status = $2, deductions = 0, completed_at = $3
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(QuestionStatus::Cancelled)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub(crate) async fn completed_deductions(
    conn: &mut PgConnection,
    test_id: i64,
) -> Result<Vec<f64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT deductions FROM test_questions WHERE test_id = $1 AND status = $2 ORDER BY id",
    )
    .bind(test_id)
    .bind(QuestionStatus::Completed)
    .fetch_all(conn)
    .await
}
