use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::security::{self, Principal};
use crate::core::state::AppState;
use crate::db::models::{Class, Test, TestQuestion};
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) Principal);

/// A verified account. Only verified accounts may run classes and tests.
pub(crate) struct CurrentTeacher(pub(crate) Principal);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let principal = security::verify_token(token, app_state.settings()).map_err(|err| {
            tracing::debug!(error = %err, "Rejected bearer token");
            ApiError::Unauthorized("Invalid authentication credentials")
        })?;

        Ok(CurrentUser(principal))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(principal) = CurrentUser::from_request_parts(parts, state).await?;

        if principal.is_verified {
            Ok(CurrentTeacher(principal))
        } else {
            Err(ApiError::Forbidden("Verified teacher account required"))
        }
    }
}

pub(crate) async fn require_class_owner(
    state: &AppState,
    teacher: &Principal,
    class_id: i64,
) -> Result<Class, ApiError> {
    let class = repositories::classes::find_by_id(state.db(), class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;

    if class.teacher_id != teacher.id {
        return Err(ApiError::Forbidden("Not the teacher of this class"));
    }

    Ok(class)
}

pub(crate) async fn require_test_owner(
    state: &AppState,
    teacher: &Principal,
    test_id: i64,
) -> Result<Test, ApiError> {
    let test = repositories::recitation_tests::find_by_id(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))?;

    require_class_owner(state, teacher, test.class_id).await?;
    Ok(test)
}

pub(crate) async fn require_question_owner(
    state: &AppState,
    teacher: &Principal,
    question_id: i64,
) -> Result<TestQuestion, ApiError> {
    let question = repositories::test_questions::find_by_id(state.db(), question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    require_test_owner(state, teacher, question.test_id).await?;
    Ok(question)
}

/// Ledger data is visible to the student and to any verified teacher who has taught them.
pub(crate) async fn require_ledger_access(
    state: &AppState,
    principal: &Principal,
    student_id: i64,
) -> Result<(), ApiError> {
    if principal.id == student_id {
        return Ok(());
    }

    if !principal.is_verified {
        return Err(ApiError::Forbidden("Access denied"));
    }

    let teaches = repositories::classes::teacher_has_student(state.db(), principal.id, student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check class roster"))?;

    if teaches {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Access denied"))
    }
}
