use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{elapsed_seconds, format_primitive};
use crate::db::models::{Test, TestMistake, TestQuestion};
use crate::db::types::{QuestionStatus, TestStatus};

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionStart {
    pub(crate) start_surah: i32,
    pub(crate) start_ayah: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionEnd {
    pub(crate) end_surah: i32,
    pub(crate) end_ayah: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestMistakeCreate {
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
    pub(crate) is_tanbeeh: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestResponse {
    pub(crate) id: i64,
    pub(crate) class_id: i64,
    pub(crate) student_id: i64,
    pub(crate) status: TestStatus,
    pub(crate) started_at: Option<String>,
    pub(crate) completed_at: Option<String>,
    pub(crate) duration_seconds: Option<i64>,
    pub(crate) total_score: Option<f64>,
    pub(crate) max_score: f64,
}

impl From<Test> for TestResponse {
    fn from(test: Test) -> Self {
        Self {
            id: test.id,
            class_id: test.class_id,
            student_id: test.student_id,
            status: test.status,
            started_at: test.started_at.map(format_primitive),
            completed_at: test.completed_at.map(format_primitive),
            duration_seconds: elapsed_seconds(test.started_at, test.completed_at),
            total_score: test.total_score,
            max_score: test.max_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: i64,
    pub(crate) test_id: i64,
    pub(crate) question_number: i32,
    pub(crate) start_surah: i32,
    pub(crate) start_ayah: i32,
    pub(crate) end_surah: Option<i32>,
    pub(crate) end_ayah: Option<i32>,
    pub(crate) deductions: f64,
    pub(crate) status: QuestionStatus,
    pub(crate) started_at: Option<String>,
    pub(crate) completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) mistakes: Option<Vec<TestMistakeResponse>>,
}

impl QuestionResponse {
    pub(crate) fn new(question: TestQuestion, mistakes: Option<Vec<TestMistakeResponse>>) -> Self {
        Self {
            id: question.id,
            test_id: question.test_id,
            question_number: question.question_number,
            start_surah: question.start_surah,
            start_ayah: question.start_ayah,
            end_surah: question.end_surah,
            end_ayah: question.end_ayah,
            deductions: question.deductions,
            status: question.status,
            started_at: question.started_at.map(format_primitive),
            completed_at: question.completed_at.map(format_primitive),
            mistakes,
        }
    }
}

impl From<TestQuestion> for QuestionResponse {
    fn from(question: TestQuestion) -> Self {
        Self::new(question, None)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TestMistakeResponse {
    pub(crate) id: i64,
    pub(crate) test_id: i64,
    pub(crate) question_id: i64,
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
    pub(crate) created_at: String,
}

impl From<TestMistake> for TestMistakeResponse {
    fn from(mistake: TestMistake) -> Self {
        Self {
            id: mistake.id,
            test_id: mistake.test_id,
            question_id: mistake.question_id,
            mistake_id: mistake.mistake_id,
            surah_number: mistake.surah_number,
            ayah_number: mistake.ayah_number,
            word_index: mistake.word_index,
            word_text: mistake.word_text,
            char_index: mistake.char_index,
            is_tanbeeh: mistake.is_tanbeeh,
            is_repeated: mistake.is_repeated,
            previous_error_count: mistake.previous_error_count,
            points_deducted: mistake.points_deducted,
            created_at: format_primitive(mistake.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TestDetailResponse {
    #[serde(flatten)]
    pub(crate) test: TestResponse,
    pub(crate) questions: Vec<QuestionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestMistakeRemoved {
    pub(crate) id: i64,
    pub(crate) remaining_error_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn payload(value: serde_json::Value) -> TestMistakeCreate {
        serde_json::from_value(value).expect("payload")
    }

    #[test]
    fn mistake_payload_defaults_to_full_word_mistake() {
        let body = payload(serde_json::json!({
            "surah_number": 2, "ayah_number": 6, "word_index": 3, "word_text": "سَوَآءٌ"
        }));

        assert!(body.validate().is_ok());
        assert_eq!(body.char_index, None);
        assert!(!body.is_tanbeeh);
    }

    #[test]
    fn mistake_payload_rejects_blank_word_and_negative_indices() {
        let blank = payload(serde_json::json!({
            "surah_number": 2, "ayah_number": 6, "word_index": 3, "word_text": ""
        }));
        let negative = payload(serde_json::json!({
            "surah_number": 2, "ayah_number": 6, "word_index": -1, "word_text": "x",
            "char_index": -2
        }));

        assert!(blank.validate().is_err());
        let errors = negative.validate().expect_err("negative indices");
        let fields = errors.field_errors();
        assert!(fields.contains_key("word_index"));
        assert!(fields.contains_key("char_index"));
    }
}
