use sqlx::PgConnection;
use time::PrimitiveDateTime;

use crate::db::models::TestMistake;
use crate::repositories::mistakes::MistakeLocation;

pub(crate) const COLUMNS: &str = "\
    id, test_id, question_id, mistake_id, surah_number, ayah_number, word_index, word_text, \
    char_index, is_tanbeeh, is_repeated, previous_error_count, points_deducted, created_at";

pub(crate) struct CreateTestMistake<'a> {
    pub(crate) test_id: i64,
    pub(crate) question_id: i64,
    pub(crate) mistake_id: i64,
    pub(crate) location: MistakeLocation,
    pub(crate) word_text: &'a str,
    pub(crate) is_tanbeeh: bool,
    pub(crate) is_repeated: bool,
    pub(crate) previous_error_count: i32,
    pub(crate) points_deducted: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    conn: &mut PgConnection,
    mistake: CreateTestMistake<'_>,
) -> Result<TestMistake, sqlx::Error> {
    sqlx::query_as::<_, TestMistake>(&format!(
        "INSERT INTO test_mistakes (
            test_id, question_id, mistake_id, surah_number, ayah_number, word_index, word_text,
            char_index, is_tanbeeh, is_repeated, previous_error_count, points_deducted, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {COLUMNS}"
    ))
    .bind(mistake.test_id)
    .bind(mistake.question_id)
    .bind(mistake.mistake_id)
    .bind(mistake.location.surah_number)
    .bind(mistake.location.ayah_number)
    .bind(mistake.location.word_index)
    .bind(mistake.word_text)
    .bind(mistake.location.char_index)
    .bind(mistake.is_tanbeeh)
    .bind(mistake.is_repeated)
    .bind(mistake.previous_error_count)
    .bind(mistake.points_deducted)
    .bind(mistake.created_at)
    .fetch_one(conn)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<TestMistake>, sqlx::Error> {
    sqlx::query_as::<_, TestMistake>(&format!("SELECT {COLUMNS} FROM test_mistakes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_by_id(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<TestMistake>, sqlx::Error> {
    sqlx::query_as::<_, TestMistake>(&format!(
        "SELECT {COLUMNS} FROM test_mistakes WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn list_by_question(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: i64,
) -> Result<Vec<TestMistake>, sqlx::Error> {
    sqlx::query_as::<_, TestMistake>(&format!(
        "SELECT {COLUMNS} FROM test_mistakes WHERE question_id = $1 ORDER BY created_at, id"
    ))
    .bind(question_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_by_test(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: i64,
) -> Result<Vec<TestMistake>, sqlx::Error> {
    sqlx::query_as::<_, TestMistake>(&format!(
        "SELECT {COLUMNS} FROM test_mistakes WHERE test_id = $1 ORDER BY question_id, created_at, id"
    ))
    .bind(test_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn sum_points_for_question(
    conn: &mut PgConnection,
    question_id: i64,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(points_deducted), 0)::DOUBLE PRECISION
         FROM test_mistakes WHERE question_id = $1",
    )
    .bind(question_id)
    .fetch_one(conn)
    .await
}

pub(crate) async fn delete(conn: &mut PgConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM test_mistakes WHERE id = $1").bind(id).execute(conn).await?;
    Ok(())
}

pub(crate) async fn delete_by_question(
    conn: &mut PgConnection,
    question_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM test_mistakes WHERE question_id = $1")
        .bind(question_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
