use sqlx::{PgConnection, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{MistakeOccurrence, MistakeRecord};

pub(crate) const COLUMNS: &str = "\
    id, student_id, surah_number, ayah_number, word_index, word_text, char_index, \
    error_count, created_at, updated_at";

const OCCURRENCE_COLUMNS: &str = "id, mistake_id, class_id, occurred_at";

/// Where a mistake happened. A `None` char index marks a whole-word mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MistakeLocation {
    pub(crate) surah_number: i32,
    pub(crate) ayah_number: i32,
    pub(crate) word_index: i32,
    pub(crate) char_index: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SurahTotal {
    pub(crate) surah_number: i32,
    pub(crate) total_errors: i64,
}

/// Creates the record with a count of one or bumps the existing count, returning
/// `(id, error_count)` after the write.
pub(crate) async fn upsert_increment(
    conn: &mut PgConnection,
    student_id: i64,
    location: MistakeLocation,
    word_text: &str,
    now: PrimitiveDateTime,
) -> Result<(i64, i32), sqlx::Error> {
    sqlx::query_as::<_, (i64, i32)>(
        "INSERT INTO mistakes (
            student_id, surah_number, ayah_number, word_index, word_text, char_index,
            error_count, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $7)
        ON CONFLICT (student_id, surah_number, ayah_number, word_index, (COALESCE(char_index, -1)))
        DO UPDATE SET error_count = mistakes.error_count + 1, updated_at = EXCLUDED.updated_at
        RETURNING id, error_count",
    )
    .bind(student_id)
    .bind(location.surah_number)
    .bind(location.ayah_number)
    .bind(location.word_index)
    .bind(word_text)
    .bind(location.char_index)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub(crate) async fn insert_occurrence(
    conn: &mut PgConnection,
    mistake_id: i64,
    class_id: i64,
    occurred_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO mistake_occurrences (mistake_id, class_id, occurred_at) VALUES ($1, $2, $3)",
    )
    .bind(mistake_id)
    .bind(class_id)
    .bind(occurred_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn lock_error_count(
    conn: &mut PgConnection,
    mistake_id: i64,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar("SELECT error_count FROM mistakes WHERE id = $1 FOR UPDATE")
        .bind(mistake_id)
        .fetch_optional(conn)
        .await
}

/// Removes the newest occurrence; insertion order breaks timestamp ties.
pub(crate) async fn delete_latest_occurrence(
    conn: &mut PgConnection,
    mistake_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM mistake_occurrences
         WHERE id = (
            SELECT id FROM mistake_occurrences
            WHERE mistake_id = $1
            ORDER BY occurred_at DESC, id DESC
            LIMIT 1
         )",
    )
    .bind(mistake_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn decrement(
    conn: &mut PgConnection,
    mistake_id: i64,
    now: PrimitiveDateTime,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE mistakes SET error_count = error_count - 1, updated_at = $2
         WHERE id = $1
         RETURNING error_count",
    )
    .bind(mistake_id)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub(crate) async fn delete(conn: &mut PgConnection, mistake_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM mistakes WHERE id = $1").bind(mistake_id).execute(conn).await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    mistake_id: i64,
) -> Result<Option<MistakeRecord>, sqlx::Error> {
    sqlx::query_as::<_, MistakeRecord>(&format!("SELECT {COLUMNS} FROM mistakes WHERE id = $1"))
        .bind(mistake_id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_by_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
    surah_number: Option<i32>,
) -> Result<Vec<MistakeRecord>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM mistakes WHERE student_id = "));
    builder.push_bind(student_id);

    if let Some(surah_number) = surah_number {
        builder.push(" AND surah_number = ");
        builder.push_bind(surah_number);
    }

    builder.push(" ORDER BY surah_number, ayah_number, word_index, char_index NULLS FIRST");

    builder.build_query_as::<MistakeRecord>().fetch_all(executor).await
}

pub(crate) async fn list_occurrences(
    executor: impl sqlx::PgExecutor<'_>,
    mistake_ids: &[i64],
) -> Result<Vec<MistakeOccurrence>, sqlx::Error> {
    if mistake_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, MistakeOccurrence>(&format!(
        "SELECT {OCCURRENCE_COLUMNS}
         FROM mistake_occurrences
         WHERE mistake_id = ANY($1)
         ORDER BY mistake_id, occurred_at DESC, id DESC"
    ))
    .bind(mistake_ids)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_by_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM mistakes WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn count_repeated_by_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM mistakes WHERE student_id = $1 AND error_count > 1")
        .bind(student_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn count_occurrences_by_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM mistake_occurrences o
         JOIN mistakes m ON m.id = o.mistake_id
         WHERE m.student_id = $1",
    )
    .bind(student_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn top_surahs(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
    limit: i64,
) -> Result<Vec<SurahTotal>, sqlx::Error> {
    sqlx::query_as::<_, SurahTotal>(
        "SELECT surah_number, SUM(error_count)::BIGINT AS total_errors
         FROM mistakes
         WHERE student_id = $1
         GROUP BY surah_number
         ORDER BY total_errors DESC, surah_number
         LIMIT $2",
    )
    .bind(student_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub(crate) async fn top_repeated(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: i64,
    limit: i64,
) -> Result<Vec<MistakeRecord>, sqlx::Error> {
    sqlx::query_as::<_, MistakeRecord>(&format!(
        "SELECT {COLUMNS} FROM mistakes
         WHERE student_id = $1 AND error_count > 1
         ORDER BY error_count DESC, id
         LIMIT $2"
    ))
    .bind(student_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}
