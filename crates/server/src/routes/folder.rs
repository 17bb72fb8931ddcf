use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use docfind_common::api::StatusResponse;

use crate::AppState;

use super::ApiError;

// ── POST /open_folder/{id} ────────────────────────────────────────────────────

pub async fn open_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let record = state.store.get(&id)?;
    let folder = state.revealer.reveal(record.original_path.as_deref())?;
    Ok(Json(StatusResponse::ok(format!("Opening folder: {}", folder.display()))))
}
