//! Teacher-driven test sessions. Every mutation goes through the test engine; the
//! handlers here only authorize and shape responses.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::delete, routing::get, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{require_question_owner, require_test_owner, CurrentTeacher, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::repositories::{self, mistakes::MistakeLocation};
use crate::schemas::recitation::{
    QuestionEnd, QuestionResponse, QuestionStart, TestDetailResponse, TestMistakeCreate,
    TestMistakeRemoved, TestMistakeResponse, TestResponse,
};
use crate::services::test_engine::{self, NewTestMistake};


pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/tests/:test_id", get(get_test))
        .route("/tests/:test_id/start", post(start_test))
        .route("/tests/:test_id/complete", post(complete_test))
        .route("/tests/:test_id/questions", post(start_question))
        .route("/questions/:question_id/end", post(end_question))
        .route("/questions/:question_id/cancel", post(cancel_question))
        .route("/questions/:question_id/mistakes", post(add_mistake))
        .route("/test-mistakes/:test_mistake_id", delete(remove_mistake))
}

async fn get_test(
    Path(test_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<TestDetailResponse>, ApiError> {
    let test = repositories::recitation_tests::find_by_id(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))?;

    if test.student_id != user.id {
        require_test_owner(&state, &user, test_id).await?;
    }

    let questions = repositories::test_questions::list_by_test(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;
    let entries = repositories::test_mistakes::list_by_test(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test mistakes"))?;

    let mut by_question: HashMap<i64, Vec<TestMistakeResponse>> = HashMap::new();
    for entry in entries {
        by_question.entry(entry.question_id).or_default().push(entry.into());
    }

    let questions = questions
        .into_iter()
        .map(|question| {
            let mistakes = by_question.remove(&question.id).unwrap_or_default();
            QuestionResponse::new(question, Some(mistakes))
        })
        .collect();

    Ok(Json(TestDetailResponse { test: test.into(), questions }))
}

async fn start_test(
    Path(test_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
) -> Result<Json<TestResponse>, ApiError> {
    require_test_owner(&state, &teacher, test_id).await?;
    let test = test_engine::start_test(state.db(), test_id).await?;
    Ok(Json(test.into()))
}

async fn complete_test(
    Path(test_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
) -> Result<Json<TestResponse>, ApiError> {
    require_test_owner(&state, &teacher, test_id).await?;
    let test = test_engine::complete_test(state.db(), test_id).await?;
    Ok(Json(test.into()))
}

async fn start_question(
    Path(test_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
    Json(payload): Json<QuestionStart>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    require_test_owner(&state, &teacher, test_id).await?;
    let question =
        test_engine::start_question(state.db(), test_id, payload.start_surah, payload.start_ayah)
            .await?;
    Ok((StatusCode::CREATED, Json(question.into())))
}

async fn end_question(
    Path(question_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
    Json(payload): Json<QuestionEnd>,
) -> Result<Json<QuestionResponse>, ApiError> {
    require_question_owner(&state, &teacher, question_id).await?;
    let question =
        test_engine::end_question(state.db(), question_id, payload.end_surah, payload.end_ayah)
            .await?;
    Ok(Json(question.into()))
}

async fn cancel_question(
    Path(question_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    require_question_owner(&state, &teacher, question_id).await?;
    let question = test_engine::cancel_question(state.db(), question_id).await?;
    Ok(Json(question.into()))
}

async fn add_mistake(
    Path(question_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
    Json(payload): Json<TestMistakeCreate>,
) -> Result<(StatusCode, Json<TestMistakeResponse>), ApiError> {
    validate_payload(&payload)?;
    require_question_owner(&state, &teacher, question_id).await?;

    let mistake = NewTestMistake {
        location: MistakeLocation {
            surah_number: payload.surah_number,
            ayah_number: payload.ayah_number,
            word_index: payload.word_index,
            char_index: payload.char_index,
        },
        word_text: payload.word_text,
        is_tanbeeh: payload.is_tanbeeh,
    };
    let entry = test_engine::add_test_mistake(state.db(), question_id, mistake).await?;

    Ok((StatusCode::CREATED, Json(entry.into())))
}

async fn remove_mistake(
    Path(test_mistake_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
) -> Result<Json<TestMistakeRemoved>, ApiError> {
    let entry = repositories::test_mistakes::find_by_id(state.db(), test_mistake_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test mistake"))?
        .ok_or_else(|| ApiError::NotFound("Test mistake not found".to_string()))?;
    require_test_owner(&state, &teacher, entry.test_id).await?;

    let removed = test_engine::remove_test_mistake(state.db(), test_mistake_id).await?;

    Ok(Json(TestMistakeRemoved {
        id: removed.test_mistake_id,
        remaining_error_count: removed.remaining_error_count,
    }))
}
