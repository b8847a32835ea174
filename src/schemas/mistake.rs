use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{MistakeOccurrence, MistakeRecord};
use crate::repositories::mistakes::SurahTotal;
use crate::schemas::class::ClassResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct ListMistakesQuery {
    #[serde(default)]
    pub(crate) surah: Option<i32>,
    #[serde(default)]
    pub(crate) with_occurrences: bool,
}

/// Classroom marking outside a test.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct MistakeCreate {
    pub(crate) surah_number: i32,
    pub(crate) ayah_number: i32,
    #[validate(range(min = 0, message = "word_index must be non-negative"))]
    pub(crate) word_index: i32,
    #[validate(length(min = 1, message = "word_text must not be empty"))]
    pub(crate) word_text: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "char_index must be non-negative"))]
    pub(crate) char_index: Option<i32>,
    #[serde(default)]
    pub(crate) class_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OccurrenceResponse {
    pub(crate) id: i64,
    pub(crate) class_id: i64,
    pub(crate) occurred_at: String,
}

impl From<MistakeOccurrence> for OccurrenceResponse {
    fn from(occurrence: MistakeOccurrence) -> Self {
        Self {
            id: occurrence.id,
            class_id: occurrence.class_id,
            occurred_at: format_primitive(occurrence.occurred_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MistakeResponse {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) surah_number: i32,
    pub(crate) ayah_number: i32,
    pub(crate) word_index: i32,
    pub(crate) word_text: String,
    pub(crate) char_index: Option<i32>,
    pub(crate) error_count: i32,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) occurrences: Option<Vec<OccurrenceResponse>>,
}

impl MistakeResponse {
    pub(crate) fn new(record: MistakeRecord, occurrences: Option<Vec<OccurrenceResponse>>) -> Self {
        Self {
            id: record.id,
            student_id: record.student_id,
            surah_number: record.surah_number,
            ayah_number: record.ayah_number,
            word_index: record.word_index,
            word_text: record.word_text,
            char_index: record.char_index,
            error_count: record.error_count,
            created_at: format_primitive(record.created_at),
            updated_at: format_primitive(record.updated_at),
            occurrences,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MistakeRecorded {
    pub(crate) mistake_id: i64,
    pub(crate) error_count: i32,
    pub(crate) previous_error_count: i32,
    pub(crate) is_repeated: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct MistakeUndone {
    pub(crate) mistake_id: i64,
    pub(crate) error_count: i32,
    pub(crate) deleted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SurahCount {
    pub(crate) surah_number: i32,
    pub(crate) count: i64,
}

impl From<SurahTotal> for SurahCount {
    fn from(total: SurahTotal) -> Self {
        Self { surah_number: total.surah_number, count: total.total_errors }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StatsResponse {
    pub(crate) student_id: i64,
    pub(crate) total_classes: i64,
    pub(crate) total_unique_mistakes: i64,
    pub(crate) repeated_mistakes: i64,
    pub(crate) total_occurrences: i64,
    pub(crate) mistakes_by_surah: Vec<SurahCount>,
    pub(crate) latest_class: Option<ClassResponse>,
    pub(crate) top_repeated_mistakes: Vec<MistakeResponse>,
}
