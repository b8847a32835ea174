use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::delete, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{require_class_owner, require_ledger_access, CurrentTeacher, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::db::types::ClassType;
use crate::repositories::{self, mistakes::MistakeLocation};
use crate::schemas::class::ClassResponse;
use crate::schemas::mistake::{
    ListMistakesQuery, MistakeCreate, MistakeRecorded, MistakeResponse, MistakeUndone,
    OccurrenceResponse, StatsResponse,
};
use crate::services::ledger;

const TOP_SURAHS: i64 = 5;
const TOP_REPEATED: i64 = 6;

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/students/:student_id/mistakes", get(list_mistakes).post(record_mistake))
        .route("/students/:student_id/stats", get(student_stats))
        .route("/mistakes/:mistake_id", delete(undo_mistake))
}

async fn list_mistakes(
    Path(student_id): Path<i64>,
    Query(params): Query<ListMistakesQuery>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<Vec<MistakeResponse>>, ApiError> {
    require_ledger_access(&state, &user, student_id).await?;

    let records = repositories::mistakes::list_by_student(state.db(), student_id, params.surah)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch mistakes"))?;

    if !params.with_occurrences {
        return Ok(Json(
            records.into_iter().map(|record| MistakeResponse::new(record, None)).collect(),
        ));
    }

    let ids: Vec<i64> = records.iter().map(|record| record.id).collect();
    let occurrences = repositories::mistakes::list_occurrences(state.db(), &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch mistake occurrences"))?;

    let mut by_mistake: HashMap<i64, Vec<OccurrenceResponse>> = HashMap::new();
    for occurrence in occurrences {
        by_mistake.entry(occurrence.mistake_id).or_default().push(occurrence.into());
    }

    Ok(Json(
        records
            .into_iter()
            .map(|record| {
                let occurrences = by_mistake.remove(&record.id).unwrap_or_default();
                MistakeResponse::new(record, Some(occurrences))
            })
            .collect(),
    ))
}

async fn record_mistake(
    Path(student_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
    Json(payload): Json<MistakeCreate>,
) -> Result<(StatusCode, Json<MistakeRecorded>), ApiError> {
    validate_payload(&payload)?;

    match payload.class_id {
        Some(class_id) => {
            let class = require_class_owner(&state, &teacher, class_id).await?;
            if class.student_id != student_id {
                return Err(ApiError::BadRequest(
                    "Class belongs to a different student".to_string(),
                ));
            }
            if class.class_type == ClassType::Test {
                return Err(ApiError::BadRequest(
                    "Test mistakes are recorded through the test's questions".to_string(),
                ));
            }
        }
        None => require_ledger_access(&state, &teacher, student_id).await?,
    }

    let location = MistakeLocation {
        surah_number: payload.surah_number,
        ayah_number: payload.ayah_number,
        word_index: payload.word_index,
        char_index: payload.char_index,
    };

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to open transaction"))?;
    let recorded = ledger::record_occurrence(
        &mut tx,
        student_id,
        location,
        &payload.word_text,
        payload.class_id,
    )
    .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to record mistake"))?;

    Ok((
        StatusCode::CREATED,
        Json(MistakeRecorded {
            mistake_id: recorded.mistake_id,
            error_count: recorded.error_count,
            previous_error_count: recorded.previous_error_count,
            is_repeated: recorded.was_preexisting(),
        }),
    ))
}

async fn undo_mistake(
    Path(mistake_id): Path<i64>,
    CurrentTeacher(teacher): CurrentTeacher,
    state: State<AppState>,
) -> Result<Json<MistakeUndone>, ApiError> {
    let record = repositories::mistakes::find_by_id(state.db(), mistake_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch mistake"))?
        .ok_or_else(|| ApiError::NotFound("Mistake not found".to_string()))?;
    require_ledger_access(&state, &teacher, record.student_id).await?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to open transaction"))?;
    let error_count = ledger::undo_occurrence(&mut tx, mistake_id).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to undo mistake"))?;

    Ok(Json(MistakeUndone { mistake_id, error_count, deleted: error_count == 0 }))
}

async fn student_stats(
    Path(student_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> Result<Json<StatsResponse>, ApiError> {
    require_ledger_access(&state, &user, student_id).await?;
    let db = state.db();
    let failed = |e: sqlx::Error| ApiError::internal(e, "Failed to compute statistics");

    let total_classes =
        repositories::classes::count_by_student(db, student_id).await.map_err(failed)?;
    let total_unique_mistakes =
        repositories::mistakes::count_by_student(db, student_id).await.map_err(failed)?;
    let repeated_mistakes =
        repositories::mistakes::count_repeated_by_student(db, student_id).await.map_err(failed)?;
    let total_occurrences = repositories::mistakes::count_occurrences_by_student(db, student_id)
        .await
        .map_err(failed)?;
    let mistakes_by_surah = repositories::mistakes::top_surahs(db, student_id, TOP_SURAHS)
        .await
        .map_err(failed)?;
    let latest_class =
        repositories::classes::latest_for_student(db, student_id).await.map_err(failed)?;
    let top_repeated = repositories::mistakes::top_repeated(db, student_id, TOP_REPEATED)
        .await
        .map_err(failed)?;

    Ok(Json(StatsResponse {
        student_id,
        total_classes,
        total_unique_mistakes,
        repeated_mistakes,
        total_occurrences,
        mistakes_by_surah: mistakes_by_surah.into_iter().map(Into::into).collect(),
        latest_class: latest_class.map(|class| ClassResponse::from_class(class, None)),
        top_repeated_mistakes: top_repeated
            .into_iter()
            .map(|record| MistakeResponse::new(record, None))
            .collect(),
    }))
}
