use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use docfind_common::DocError;
use docfind_extract_dispatch::ViewContent;

use crate::AppState;

use super::{content_disposition, run_blocking, ApiError};

// ── GET /get_file/{id} ────────────────────────────────────────────────────────
//
// PDFs inline, DOCX/DOC/XLSX/XLS/CSV as extracted plain text, everything else
// as a download.

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state.store.get(&id)?;
    let dispatcher = state.dispatcher.clone();
    let filename = record.filename.clone();

    let content = run_blocking(move || {
        dispatcher.extract_for_view(record.data.clone(), &record.filename)
    })
    .await?;

    Ok(match content {
        ViewContent::Inline { data, mime } => (
            [
                (header::CONTENT_TYPE, mime),
                (header::CONTENT_DISPOSITION, content_disposition("inline", &filename)),
            ],
            data.to_vec(),
        )
            .into_response(),
        ViewContent::Text(text) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, content_disposition("inline", &filename)),
            ],
            text,
        )
            .into_response(),
        ViewContent::Attachment { data, mime } => (
            [
                (header::CONTENT_TYPE, mime),
                (header::CONTENT_DISPOSITION, content_disposition("attachment", &filename)),
            ],
            data.to_vec(),
        )
            .into_response(),
    })
}

// ── GET /open_browser?file_id=X ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OpenBrowserParams {
    pub file_id: Option<String>,
}

pub async fn open_browser(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OpenBrowserParams>,
) -> Result<Response, ApiError> {
    let id = params.file_id.ok_or(DocError::NotFound)?;
    let record = state.store.get(&id)?;
    let mime = mime_guess::from_path(&record.filename).first_or_octet_stream().to_string();
    Ok((
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, content_disposition("inline", &record.filename)),
        ],
        record.data.to_vec(),
    )
        .into_response())
}
