use serde::Serialize;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{ClassType, QuestionStatus, TestStatus};

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Class {
    pub(crate) id: i64,
    pub(crate) teacher_id: i64,
    pub(crate) student_id: i64,
    pub(crate) class_type: ClassType,
    pub(crate) notes: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct MistakeRecord {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) surah_number: i32,
    pub(crate) ayah_number: i32,
    pub(crate) word_index: i32,
    pub(crate) word_text: String,
    pub(crate) char_index: Option<i32>,
    pub(crate) error_count: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct MistakeOccurrence {
    pub(crate) id: i64,
    pub(crate) mistake_id: i64,
    pub(crate) class_id: i64,
    pub(crate) occurred_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct Test {
    pub(crate) id: i64,
    pub(crate) class_id: i64,
    pub(crate) student_id: i64,
    pub(crate) status: TestStatus,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) total_score: Option<f64>,
    pub(crate) max_score: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct TestQuestion {
    pub(crate) id: i64,
    pub(crate) test_id: i64,
    pub(crate) question_number: i32,
    pub(crate) start_surah: i32,
    pub(crate) start_ayah: i32,
    pub(crate) end_surah: Option<i32>,
    pub(crate) end_ayah: Option<i32>,
    /// Sum of points deducted for this question's mistakes, fixed when it completes.
    pub(crate) deductions: f64,
    pub(crate) status: QuestionStatus,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct TestMistake {
    pub(crate) id: i64,
    pub(crate) test_id: i64,
    pub(crate) question_id: i64,
    /// `None` once the ledger record it pointed at has been removed outside the test.
    pub(crate) mistake_id: Option<i64>,
    pub(crate) surah_number: i32,
    pub(crate) ayah_number: i32,
    pub(crate) word_index: i32,
    pub(crate) word_text: String,
    pub(crate) char_index: Option<i32>,
    pub(crate) is_tanbeeh: bool,
    pub(crate) is_repeated: bool,
    pub(crate) previous_error_count: i32,
    pub(crate) points_deducted: f64,
    pub(crate) created_at: PrimitiveDateTime,
}
