use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};

use docfind_common::api::UploadResponse;

use crate::AppState;

use super::{run_blocking, ApiError};

struct Upload {
    filename: String,
    data: Vec<u8>,
    original_path: Option<String>,
}

/// Read the `file` part and, when `with_path`, the `original_path` part.
async fn read_upload(mut multipart: Multipart, with_path: bool) -> Result<Upload, ApiError> {
    let mut file = None;
    let mut original_path = None;

    while let Some(field) = multipart.next_field().await.map_err(ApiError::multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(ApiError::multipart)?;
                file = Some((filename, data.to_vec()));
            }
            "original_path" if with_path => {
                let text = field.text().await.map_err(ApiError::multipart)?;
                original_path = Some(text).filter(|p| !p.trim().is_empty());
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| ApiError::bad_request("No file part in the request."))?;
    if filename.is_empty() {
        return Err(ApiError::bad_request("No selected file."));
    }
    Ok(Upload { filename, data, original_path })
}

async fn store_upload(state: &AppState, upload: Upload) -> Result<Json<UploadResponse>, ApiError> {
    let store = state.store.clone();
    let file_id = run_blocking(move || {
        Ok(store.put(upload.data, &upload.filename, upload.original_path))
    })
    .await?;
    Ok(Json(UploadResponse { status: "ok".into(), file_id }))
}

// ── POST /upload_for_view ─────────────────────────────────────────────────────

pub async fn upload_for_view(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload = read_upload(multipart, true).await?;
    store_upload(&state, upload).await
}

// ── POST /store_file_temp ─────────────────────────────────────────────────────
//
// Older variant of the upload: no original path is recorded, so the folder of
// a file stored this way cannot be revealed.

pub async fn store_file_temp(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload = read_upload(multipart, false).await?;
    store_upload(&state, upload).await
}
