use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use semstore_core::{Entry, EntryId, EntryService, ServiceError};
use serde_json::Value;
use tokio::task;

use crate::errors::{map_json_rejection, map_service_error, ApiError};
pub(crate) use crate::handlers_health::{live, ready};
pub(crate) use crate::handlers_search::search_entries;
use crate::models::DeleteEntryResponse;
use crate::state::AppState;

pub(crate) async fn create_entry(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Entry>), ApiError> {
    let Json(payload) = payload.map_err(map_json_rejection)?;
    let entry = run_blocking(&state, move |service| service.create(&payload)).await?;

    tracing::info!(id = %entry.id, "entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

pub(crate) async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_entry_id(&id)?;
    let entry = run_blocking(&state, move |service| service.get(id)).await?;
    Ok(Json(entry))
}

pub(crate) async fn replace_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_entry_id(&id)?;
    let Json(payload) = payload.map_err(map_json_rejection)?;
    let entry = run_blocking(&state, move |service| service.replace(id, &payload)).await?;

    tracing::info!(%id, "entry replaced");
    Ok(Json(entry))
}

/// Always answers 501; clients must send the full record with `PUT`.
pub(crate) async fn patch_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    let id = parse_entry_id(&id)?;
    let entry = run_blocking(&state, move |service| service.patch(id, &Value::Null)).await?;
    Ok(Json(entry))
}

pub(crate) async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteEntryResponse>, ApiError> {
    let id = parse_entry_id(&id)?;
    run_blocking(&state, move |service| service.delete(id)).await?;

    tracing::info!(%id, "entry deleted");
    Ok(Json(DeleteEntryResponse { id, deleted: true }))
}

pub(crate) fn parse_entry_id(raw: &str) -> Result<EntryId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::invalid_argument(format!("entry id '{raw}' is not a valid UUID")))
}

/// Runs a service call off the async executor. The store holds blocking
/// locks and search fans out over rayon.
pub(crate) async fn run_blocking<T, F>(state: &AppState, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&EntryService) -> Result<T, ServiceError> + Send + 'static,
{
    let service = state.service.clone();
    task::spawn_blocking(move || call(&service))
        .await
        .map_err(|_| ApiError::internal("entry worker task failed"))?
        .map_err(map_service_error)
}
