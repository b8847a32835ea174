use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Class;
use crate::db::types::ClassType;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ClassCreate {
    #[validate(range(min = 1, message = "student_id must be positive"))]
    pub(crate) student_id: i64,
    #[serde(default = "default_class_type")]
    pub(crate) class_type: ClassType,
    #[serde(default)]
    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub(crate) notes: Option<String>,
}

fn default_class_type() -> ClassType {
    ClassType::Lesson
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassResponse {
    pub(crate) id: i64,
    pub(crate) teacher_id: i64,
    pub(crate) student_id: i64,
    pub(crate) class_type: ClassType,
    pub(crate) notes: Option<String>,
    pub(crate) test_id: Option<i64>,
    pub(crate) created_at: String,
}

impl ClassResponse {
    pub(crate) fn from_class(class: Class, test_id: Option<i64>) -> Self {
        Self {
            id: class.id,
            teacher_id: class.teacher_id,
            student_id: class.student_id,
            class_type: class.class_type,
            notes: class.notes,
            test_id,
            created_at: format_primitive(class.created_at),
        }
    }
}
