use axum::extract::State;
use axum::Json;
use tokio::task;

use crate::errors::ApiError;
use crate::models::{LiveResponse, ReadyChecks, ReadyResponse};
use crate::state::AppState;

pub(crate) async fn live(State(state): State<AppState>) -> Json<LiveResponse> {
    Json(LiveResponse {
        status: "live",
        uptime_ms: state.started_at.elapsed().as_millis() as u64,
    })
}

pub(crate) async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, ApiError> {
    let service = state.service.clone();
    let count = task::spawn_blocking(move || service.entry_count())
        .await
        .map_err(|_| ApiError::internal("readiness probe task failed"))?;

    match count {
        Ok(entry_count) => Ok(Json(ReadyResponse {
            status: "ready",
            uptime_ms: state.started_at.elapsed().as_millis() as u64,
            entry_count,
            checks: ReadyChecks {
                storage_available: true,
            },
        })),
        Err(error) => {
            tracing::error!(%error, "readiness probe failed");
            Err(ApiError::service_unavailable("entry store is not ready"))
        }
    }
}
