use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use semstore_core::{Entry, RankedResults};
use serde_json::Value;

use crate::errors::{map_json_rejection, ApiError};
use crate::handlers::run_blocking;
use crate::state::AppState;

pub(crate) async fn search_entries(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RankedResults<Entry>>, ApiError> {
    let Json(payload) = payload.map_err(map_json_rejection)?;
    let results = run_blocking(&state, move |service| service.search(&payload)).await?;

    tracing::debug!(
        count = results.count,
        threshold = results.threshold,
        "search completed"
    );
    Ok(Json(results))
}
