use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "classtype", rename_all = "lowercase")]
pub(crate) enum ClassType {
    Lesson,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "teststatus", rename_all = "snake_case")]
pub(crate) enum TestStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questionstatus", rename_all = "snake_case")]
pub(crate) enum QuestionStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TestStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl QuestionStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_as_snake_case() {
        assert_eq!(serde_json::to_value(TestStatus::NotStarted).unwrap(), "not_started");
        assert_eq!(serde_json::to_value(QuestionStatus::InProgress).unwrap(), "in_progress");
        assert_eq!(serde_json::to_value(ClassType::Test).unwrap(), "test");
    }

    #[test]
    fn unknown_class_type_is_rejected() {
        assert!(serde_json::from_str::<ClassType>("\"exam\"").is_err());
        assert_eq!(serde_json::from_str::<ClassType>("\"lesson\"").unwrap(), ClassType::Lesson);
    }
}
