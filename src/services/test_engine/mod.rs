//! Oral test lifecycle: test and question state machines plus mistake entry.
//!
//! Every public operation opens its own transaction and locks the owning test row
//! before touching questions, so operations on one test are serialized and locks are
//! always taken in the order test, then question.

use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Test, TestMistake, TestQuestion};
use crate::db::types::{QuestionStatus, TestStatus};
use crate::repositories::mistakes::MistakeLocation;
use crate::repositories::{recitation_tests, test_mistakes, test_questions};
use crate::services::ledger::{self, LedgerError};
use crate::services::scoring;


#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{entity} {id} is {current}, expected {required}")]
    InvalidState { entity: &'static str, id: i64, current: &'static str, required: &'static str },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(id) => Self::NotFound { entity: "mistake", id },
            LedgerError::Database(err) => Self::Database(err),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewTestMistake {
    pub(crate) location: MistakeLocation,
    pub(crate) word_text: String,
    pub(crate) is_tanbeeh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RemovedTestMistake {
    pub(crate) test_mistake_id: i64,
    /// Ledger count left behind, `None` when the ledger record was already gone.
    pub(crate) remaining_error_count: Option<i32>,
}

pub(crate) fn ensure_test_status(test: &Test, required: TestStatus) -> Result<(), EngineError> {
    if test.status == required {
        return Ok(());
    }

    Err(EngineError::InvalidState {
        entity: "test",
        id: test.id,
        current: test.status.as_str(),
        required: required.as_str(),
    })
}

pub(crate) fn ensure_question_in_progress(question: &TestQuestion) -> Result<(), EngineError> {
    if question.status == QuestionStatus::InProgress {
        return Ok(());
    }

    Err(EngineError::InvalidState {
        entity: "question",
        id: question.id,
        current: question.status.as_str(),
        required: QuestionStatus::InProgress.as_str(),
    })
}

pub(crate) async fn start_test(pool: &PgPool, test_id: i64) -> Result<Test, EngineError> {
    let mut tx = pool.begin().await?;

    let test = lock_test(&mut tx, test_id).await?;
    ensure_test_status(&test, TestStatus::NotStarted)?;

    let test = recitation_tests::mark_started(&mut tx, test_id, primitive_now_utc()).await?;
    tx.commit().await?;

    metrics::record_transition("test_start");
    tracing::info!(action = "test_start", test_id, student_id = test.student_id, "Test started");

    Ok(test)
}

pub(crate) async fn complete_test(pool: &PgPool, test_id: i64) -> Result<Test, EngineError> {
    let mut tx = pool.begin().await?;

    let test = lock_test(&mut tx, test_id).await?;
    ensure_test_status(&test, TestStatus::InProgress)?;

    if let Some(active_id) = test_questions::find_active_id(&mut tx, test_id).await? {
        test_questions::lock_by_id(&mut tx, active_id).await?;
        let (_, rolled_back) = discard_question(&mut tx, active_id).await?;
        metrics::record_transition("question_cancel");
        tracing::warn!(
            test_id,
            question_id = active_id,
            rolled_back,
            "Question still in progress at completion; cancelled"
        );
    }

    let deductions = test_questions::completed_deductions(&mut tx, test_id).await?;
    let total_score = scoring::final_score(&deductions);

    let test =
        recitation_tests::mark_completed(&mut tx, test_id, total_score, primitive_now_utc())
            .await?;
    tx.commit().await?;

    metrics::record_transition("test_complete");
    tracing::info!(
        action = "test_complete",
        test_id,
        student_id = test.student_id,
        scored_questions = deductions.len(),
        total_score,
        "Test completed"
    );

    Ok(test)
}

pub(crate) async fn start_question(
    pool: &PgPool,
    test_id: i64,
    start_surah: i32,
    start_ayah: i32,
) -> Result<TestQuestion, EngineError> {
    let mut tx = pool.begin().await?;

    let test = lock_test(&mut tx, test_id).await?;
    ensure_test_status(&test, TestStatus::InProgress)?;

    if let Some(active_id) = test_questions::find_active_id(&mut tx, test_id).await? {
        return Err(EngineError::InvalidState {
            entity: "question",
            id: active_id,
            current: QuestionStatus::InProgress.as_str(),
            required: "completed or cancelled",
        });
    }

    let question_number = test_questions::next_number(&mut tx, test_id).await?;
    let question = test_questions::create_in_progress(
        &mut tx,
        test_questions::CreateQuestion {
            test_id,
            question_number,
            start_surah,
            start_ayah,
            started_at: primitive_now_utc(),
        },
    )
    .await?;
    tx.commit().await?;

    metrics::record_transition("question_start");
    tracing::info!(
        action = "question_start",
        test_id,
        question_id = question.id,
        question_number,
        "Question started"
    );

    Ok(question)
}

pub(crate) async fn end_question(
    pool: &PgPool,
    question_id: i64,
    end_surah: i32,
    end_ayah: i32,
) -> Result<TestQuestion, EngineError> {
    let mut tx = pool.begin().await?;

    lock_active_question(&mut tx, question_id).await?;

    let deductions = test_mistakes::sum_points_for_question(&mut tx, question_id).await?;
    let question = test_questions::mark_completed(
        &mut tx,
        question_id,
        end_surah,
        end_ayah,
        deductions,
        primitive_now_utc(),
    )
    .await?;
    tx.commit().await?;

    metrics::record_transition("question_end");
    tracing::info!(
        action = "question_end",
        test_id = question.test_id,
        question_id,
        deductions,
        "Question completed"
    );

    Ok(question)
}

pub(crate) async fn cancel_question(
    pool: &PgPool,
    question_id: i64,
) -> Result<TestQuestion, EngineError> {
    let mut tx = pool.begin().await?;

    lock_active_question(&mut tx, question_id).await?;

    let (question, rolled_back) = discard_question(&mut tx, question_id).await?;
    tx.commit().await?;

    metrics::record_transition("question_cancel");
    tracing::info!(
        action = "question_cancel",
        test_id = question.test_id,
        question_id,
        rolled_back,
        "Question cancelled"
    );

    Ok(question)
}

pub(crate) async fn add_test_mistake(
    pool: &PgPool,
    question_id: i64,
    mistake: NewTestMistake,
) -> Result<TestMistake, EngineError> {
    let mut tx = pool.begin().await?;

    let (test, question) = lock_active_question(&mut tx, question_id).await?;

    let recorded = ledger::record_occurrence(
        &mut tx,
        test.student_id,
        mistake.location,
        &mistake.word_text,
        Some(test.class_id),
    )
    .await?;
    let points_deducted = scoring::deduction(recorded.previous_error_count, mistake.is_tanbeeh);

    let entry = test_mistakes::create(
        &mut tx,
        test_mistakes::CreateTestMistake {
            test_id: test.id,
            question_id: question.id,
            mistake_id: recorded.mistake_id,
            location: mistake.location,
            word_text: &mistake.word_text,
            is_tanbeeh: mistake.is_tanbeeh,
            is_repeated: recorded.was_preexisting(),
            previous_error_count: recorded.previous_error_count,
            points_deducted,
            created_at: primitive_now_utc(),
        },
    )
    .await?;
    tx.commit().await?;

    metrics::record_test_mistake(if mistake.is_tanbeeh { "tanbeeh" } else { "mistake" });
    tracing::info!(
        action = "test_mistake_add",
        test_id = test.id,
        question_id,
        test_mistake_id = entry.id,
        mistake_id = recorded.mistake_id,
        previous_error_count = recorded.previous_error_count,
        points_deducted,
        "Test mistake recorded"
    );

    Ok(entry)
}

pub(crate) async fn remove_test_mistake(
    pool: &PgPool,
    test_mistake_id: i64,
) -> Result<RemovedTestMistake, EngineError> {
    let mut tx = pool.begin().await?;

    let not_found = || EngineError::NotFound { entity: "test mistake", id: test_mistake_id };
    let question_id = test_mistakes::find_by_id(&mut *tx, test_mistake_id)
        .await?
        .ok_or_else(not_found)?
        .question_id;
    lock_active_question(&mut tx, question_id).await?;

    // A concurrent removal may have won the test lock first.
    let entry = test_mistakes::lock_by_id(&mut tx, test_mistake_id).await?.ok_or_else(not_found)?;

    let remaining_error_count = rollback_ledger(&mut tx, &entry).await?;
    test_mistakes::delete(&mut tx, test_mistake_id).await?;
    tx.commit().await?;

    metrics::record_test_mistake("removed");
    tracing::info!(
        action = "test_mistake_remove",
        test_id = entry.test_id,
        question_id = entry.question_id,
        test_mistake_id,
        "Test mistake removed"
    );

    Ok(RemovedTestMistake { test_mistake_id, remaining_error_count })
}

async fn lock_test(conn: &mut PgConnection, test_id: i64) -> Result<Test, EngineError> {
    recitation_tests::lock_by_id(conn, test_id)
        .await?
        .ok_or(EngineError::NotFound { entity: "test", id: test_id })
}

/// Locks the owning test and the question, and checks that both are in progress.
async fn lock_active_question(
    conn: &mut PgConnection,
    question_id: i64,
) -> Result<(Test, TestQuestion), EngineError> {
    let test_id = test_questions::find_by_id(&mut *conn, question_id)
        .await?
        .map(|question| question.test_id)
        .ok_or(EngineError::NotFound { entity: "question", id: question_id })?;

    let test = lock_test(&mut *conn, test_id).await?;
    let question = test_questions::lock_by_id(&mut *conn, question_id)
        .await?
        .ok_or(EngineError::NotFound { entity: "question", id: question_id })?;

    ensure_question_in_progress(&question)?;
    ensure_test_status(&test, TestStatus::InProgress)?;

    Ok((test, question))
}

/// Undoes the question's ledger changes newest first, drops its entries and marks it
/// cancelled. The caller holds the test and question locks.
async fn discard_question(
    conn: &mut PgConnection,
    question_id: i64,
) -> Result<(TestQuestion, usize), EngineError> {
    let entries = test_mistakes::list_by_question(&mut *conn, question_id).await?;
    for entry in entries.iter().rev() {
        rollback_ledger(&mut *conn, entry).await?;
    }
    test_mistakes::delete_by_question(&mut *conn, question_id).await?;
    let question = test_questions::mark_cancelled(conn, question_id, primitive_now_utc()).await?;

    Ok((question, entries.len()))
}

async fn rollback_ledger(
    conn: &mut PgConnection,
    entry: &TestMistake,
) -> Result<Option<i32>, EngineError> {
    let Some(mistake_id) = entry.mistake_id else {
        tracing::warn!(
            test_mistake_id = entry.id,
            "Ledger record already removed; skipping rollback"
        );
        return Ok(None);
    };

    let remaining = ledger::undo_occurrence(conn, mistake_id).await?;
    Ok(Some(remaining))
}
