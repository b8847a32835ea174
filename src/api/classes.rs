use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::class::{ClassCreate, ClassResponse};
use crate::services::classes;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(create_class)).route("/:class_id", get(get_class))
}

async fn create_class(
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
    Json(payload): Json<ClassCreate>,
) -> Result<(StatusCode, Json<ClassResponse>), ApiError> {
    validate_payload(&payload)?;

    let created = classes::create_class(
        state.db(),
        teacher.id,
        payload.student_id,
        payload.class_type,
        payload.notes.as_deref(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create class"))?;

    let test_id = created.test.map(|test| test.id);
    Ok((StatusCode::CREATED, Json(ClassResponse::from_class(created.class, test_id))))
}

async fn get_class(
    Path(class_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<ClassResponse>, ApiError> {
    let class = repositories::classes::find_by_id(state.db(), class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;

    if class.teacher_id != user.id && class.student_id != user.id {
        return Err(ApiError::Forbidden("Access denied"));
    }

    let test_id = repositories::recitation_tests::find_by_class(state.db(), class.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?
        .map(|test| test.id);

    Ok(Json(ClassResponse::from_class(class, test_id)))
}
