use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::Error;
use crate::models::*;

/// Largest page of entry history a single request can ask for.
const MAX_ENTRY_LIMIT: u32 = 500;

// ============================================================
// Error Handling
// ============================================================

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Caller mistakes are returned with their message. Storage failures are
/// logged in full, and clients only see a generic message.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound { .. } | Error::UnknownLesson(_) => StatusCode::NOT_FOUND,
            Error::InvalidStep(_) => StatusCode::CONFLICT,
            Error::InvalidChildId(_)
            | Error::InvalidEntry(_)
            | Error::InvalidSelection(_)
            | Error::IncompleteSelections => StatusCode::BAD_REQUEST,
            Error::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let message = if let Error::StorageUnavailable(detail) = &self {
            tracing::error!("Storage error: {}", detail);
            "Storage temporarily unavailable".to_string()
        } else {
            tracing::warn!("Rejected request: {}", self);
            self.to_string()
        };

        let body = ErrorBody {
            error: self.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Catalog
// ============================================================

pub async fn list_lessons(State(state): State<AppState>) -> Json<Vec<LessonDefinition>> {
    Json(state.store.catalog().lessons().to_vec())
}

pub async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LessonDefinition>, Error> {
    state.store.catalog().lesson(&id).cloned().map(Json)
}

pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<FoodCategory>> {
    Json(state.store.catalog().categories().to_vec())
}

/// Query parameters for listing foods.
#[derive(Debug, Deserialize)]
pub struct ListFoodsQuery {
    /// Only foods in this category.
    pub category: Option<String>,
}

pub async fn list_foods(
    State(state): State<AppState>,
    Query(query): Query<ListFoodsQuery>,
) -> Result<Json<Vec<FoodItem>>, Error> {
    let catalog = state.store.catalog();
    let foods = match query.category {
        Some(category) => {
            catalog.category(&category)?;
            catalog.foods_in(&category).cloned().collect()
        }
        None => catalog.foods().to_vec(),
    };
    Ok(Json(foods))
}

pub async fn list_activities(State(state): State<AppState>) -> Json<Vec<ActivityDefinition>> {
    Json(state.store.catalog().activities().to_vec())
}

// ============================================================
// Progress
// ============================================================

pub async fn get_progress(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
) -> Result<Json<ChildProgress>, Error> {
    state.store.load(&child_id).map(Json)
}

pub async fn get_path(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
) -> Result<Json<PathView>, Error> {
    state.store.path(&child_id).map(Json)
}

pub async fn complete_lesson(
    State(state): State<AppState>,
    Path((child_id, lesson_id)): Path<(String, String)>,
) -> Result<Json<LessonCompletion>, Error> {
    state.store.complete_lesson(&child_id, &lesson_id).map(Json)
}

/// Query parameters for entry history.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// Maximum number of entries. Defaults to 50, capped at 500.
    pub limit: Option<u32>,
}

pub async fn list_entries(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<Vec<Entry>>, Error> {
    let limit = query.limit.map(|l| l.min(MAX_ENTRY_LIMIT));
    state.store.entries(&child_id, limit).map(Json)
}

// ============================================================
// Logging Sessions
// ============================================================

pub async fn start_session(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
    Json(input): Json<StartSessionInput>,
) -> Result<(StatusCode, Json<LogSessionView>), Error> {
    state
        .sessions
        .start(&state.store, &child_id, input.kind)
        .map(|view| (StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path((child_id, session_id)): Path<(String, Uuid)>,
) -> Result<Json<LogSessionView>, Error> {
    state.sessions.get(&child_id, session_id).map(Json)
}

pub async fn select_step(
    State(state): State<AppState>,
    Path((child_id, session_id)): Path<(String, Uuid)>,
    Json(input): Json<StepInput>,
) -> Result<Json<LogSessionView>, Error> {
    state
        .sessions
        .select(state.store.catalog(), &child_id, session_id, input)
        .map(Json)
}

pub async fn step_back(
    State(state): State<AppState>,
    Path((child_id, session_id)): Path<(String, Uuid)>,
) -> Result<Json<LogSessionView>, Error> {
    state.sessions.back(&child_id, session_id).map(Json)
}

pub async fn commit_session(
    State(state): State<AppState>,
    Path((child_id, session_id)): Path<(String, Uuid)>,
) -> Result<(StatusCode, Json<EntryReceipt>), Error> {
    state
        .sessions
        .commit(&state.store, &child_id, session_id)
        .map(|receipt| (StatusCode::CREATED, Json(receipt)))
}

pub async fn abandon_session(
    State(state): State<AppState>,
    Path((child_id, session_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, Error> {
    state.sessions.abandon(&child_id, session_id)?;
    Ok(StatusCode::NO_CONTENT)
}
