//! Per-student mistake ledger. Every write goes through an open transaction so callers
//! can couple ledger changes to their own rows.

use sqlx::PgConnection;
use thiserror::Error;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::repositories::mistakes::{self, MistakeLocation};

#[derive(Debug, Error)]
pub(crate) enum LedgerError {
    #[error("mistake {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordedOccurrence {
    pub(crate) mistake_id: i64,
    pub(crate) error_count: i32,
    pub(crate) previous_error_count: i32,
}

impl RecordedOccurrence {
    pub(crate) fn was_preexisting(&self) -> bool {
        self.previous_error_count > 0
    }
}

pub(crate) async fn record_occurrence(
    conn: &mut PgConnection,
    student_id: i64,
    location: MistakeLocation,
    word_text: &str,
    class_id: Option<i64>,
) -> Result<RecordedOccurrence, LedgerError> {
    let now = primitive_now_utc();
    let (mistake_id, error_count) =
        mistakes::upsert_increment(&mut *conn, student_id, location, word_text, now).await?;

    if let Some(class_id) = class_id {
        mistakes::insert_occurrence(&mut *conn, mistake_id, class_id, now).await?;
    }

    let recorded =
        RecordedOccurrence { mistake_id, error_count, previous_error_count: error_count - 1 };

    metrics::record_ledger_change(if recorded.was_preexisting() {
        "increment"
    } else {
        "create"
    });
    tracing::debug!(
        action = "ledger_record",
        student_id,
        mistake_id,
        error_count,
        "Mistake occurrence recorded"
    );

    Ok(recorded)
}

/// Reverses the latest occurrence and returns the remaining count. Zero means the
/// record is gone.
pub(crate) async fn undo_occurrence(
    conn: &mut PgConnection,
    mistake_id: i64,
) -> Result<i32, LedgerError> {
    let Some(error_count) = mistakes::lock_error_count(&mut *conn, mistake_id).await? else {
        return Err(LedgerError::NotFound(mistake_id));
    };

    mistakes::delete_latest_occurrence(&mut *conn, mistake_id).await?;

    let remaining = if error_count <= 1 {
        mistakes::delete(&mut *conn, mistake_id).await?;
        metrics::record_ledger_change("delete");
        0
    } else {
        let remaining = mistakes::decrement(&mut *conn, mistake_id, primitive_now_utc()).await?;
        metrics::record_ledger_change("decrement");
        remaining
    };

    tracing::debug!(action = "ledger_undo", mistake_id, remaining, "Mistake occurrence undone");

    Ok(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn location(word_index: i32, char_index: Option<i32>) -> MistakeLocation {
        MistakeLocation { surah_number: 2, ayah_number: 255, word_index, char_index }
    }

    #[test]
    fn preexisting_follows_previous_count() {
        let fresh = RecordedOccurrence { mistake_id: 1, error_count: 1, previous_error_count: 0 };
        let repeat = RecordedOccurrence { mistake_id: 1, error_count: 3, previous_error_count: 2 };
        assert!(!fresh.was_preexisting());
        assert!(repeat.was_preexisting());
    }

    #[tokio::test]
    async fn record_then_undo_restores_ledger() {
        let ctx = test_support::setup_test_context().await;
        let class = test_support::insert_lesson(ctx.state.db(), 10, 20).await;
        let mut tx = ctx.state.db().begin().await.expect("tx");

        let word = "ٱللَّهُ";
        let first = record_occurrence(&mut tx, 20, location(3, None), word, Some(class.id))
            .await
            .expect("first");
        let second = record_occurrence(&mut tx, 20, location(3, None), word, Some(class.id))
            .await
            .expect("second");

        assert_eq!(first.mistake_id, second.mistake_id);
        assert_eq!((first.error_count, first.previous_error_count), (1, 0));
        assert_eq!((second.error_count, second.previous_error_count), (2, 1));

        assert_eq!(undo_occurrence(&mut tx, first.mistake_id).await.expect("undo"), 1);
        assert_eq!(undo_occurrence(&mut tx, first.mistake_id).await.expect("undo"), 0);
        assert!(matches!(
            undo_occurrence(&mut tx, first.mistake_id).await,
            Err(LedgerError::NotFound(_))
        ));

        let occurrences: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mistake_occurrences")
            .fetch_one(&mut *tx)
            .await
            .expect("count");
        assert_eq!(occurrences, 0);
    }

    #[tokio::test]
    async fn missing_char_index_is_its_own_bucket() {
        let ctx = test_support::setup_test_context().await;
        let mut tx = ctx.state.db().begin().await.expect("tx");

        let word = record_occurrence(&mut tx, 20, location(1, None), "بِسْمِ", None)
            .await
            .expect("word");
        let letter = record_occurrence(&mut tx, 20, location(1, Some(0)), "بِسْمِ", None)
            .await
            .expect("letter");
        let other_student = record_occurrence(&mut tx, 21, location(1, None), "بِسْمِ", None)
            .await
            .expect("other student");

        assert_ne!(word.mistake_id, letter.mistake_id);
        assert_ne!(word.mistake_id, other_student.mistake_id);
        assert_eq!(letter.error_count, 1);
        assert_eq!(other_student.error_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_lose_no_increment() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db().clone();

        let records: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let mut tx = pool.begin().await?;
                    let recorded =
                        record_occurrence(&mut tx, 20, location(5, Some(1)), "قُلْ", None).await?;
                    tx.commit().await?;
                    Ok::<_, LedgerError>(recorded)
                })
            })
            .collect();

        let mut previous = Vec::new();
        for record in records {
            let recorded = record.await.expect("join").expect("record");
            previous.push(recorded.previous_error_count);
        }
        previous.sort_unstable();
        assert_eq!(previous, vec![0, 1, 2, 3]);

        let counts: Vec<i32> = sqlx::query_scalar("SELECT error_count FROM mistakes")
            .fetch_all(&pool)
            .await
            .expect("counts");
        assert_eq!(counts, vec![4]);
    }
}
