use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query as QueryParams, State},
    Json,
};
use serde::Deserialize;

use docfind_common::api::SearchResponse;
use docfind_common::Query;
use docfind_extract_dispatch::SourceFile;

use crate::AppState;

use super::{run_blocking, ApiError};

// ── POST /search_upload ───────────────────────────────────────────────────────
//
// Multipart form: `q`, one or more `files`, and an optional `paths` JSON object
// mapping each uploaded filename to the path it was picked from.

pub async fn search_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SearchResponse>, ApiError> {
    let mut raw_query = String::new();
    let mut paths_json = None;
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(ApiError::multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "q" => raw_query = field.text().await.map_err(ApiError::multipart)?,
            "paths" => paths_json = Some(field.text().await.map_err(ApiError::multipart)?),
            "files" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(ApiError::multipart)?;
                files.push((filename, data.to_vec()));
            }
            _ => {}
        }
    }

    if raw_query.trim().is_empty() {
        return Err(ApiError::bad_request("Missing 'q' parameter."));
    }
    let query = Query::parse(&raw_query)?;
    if files.is_empty() {
        return Err(ApiError::bad_request("No files uploaded."));
    }
    let paths: HashMap<String, String> = match paths_json.as_deref().map(str::trim) {
        None | Some("") => HashMap::new(),
        Some(json) => serde_json::from_str(json)
            .map_err(|e| ApiError::bad_request(format!("Invalid 'paths' parameter: {e}")))?,
    };

    let dispatcher = state.dispatcher.clone();
    let report = run_blocking(move || {
        let sources: Vec<SourceFile<'_>> = files
            .iter()
            .map(|(name, data)| SourceFile {
                name,
                declared_path: paths.get(name).map(String::as_str),
                data,
            })
            .collect();
        Ok(dispatcher.search_files(&query, &sources))
    })
    .await?;

    tracing::info!(
        "search '{}': {} match(es), {} failed file(s)",
        raw_query.trim(),
        report.count,
        report.failures.len()
    );
    Ok(Json(SearchResponse {
        status: "ok",
        matches: report.matches,
        count: report.count,
        failures: report.failures,
    }))
}

// ── GET /search/{id}?q=X ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct StoredSearchParams {
    #[serde(default)]
    pub q: String,
}

pub async fn search_stored(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<StoredSearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = Query::parse(&params.q)?;
    let record = state.store.get(&id)?;
    let dispatcher = state.dispatcher.clone();

    let matches = run_blocking(move || {
        let source = SourceFile {
            name: &record.filename,
            declared_path: record.original_path.as_deref(),
            data: &record.data,
        };
        dispatcher.search_file(&query, &source)
    })
    .await?;

    Ok(Json(SearchResponse {
        status: "ok",
        count: matches.len(),
        matches,
        failures: Vec::new(),
    }))
}
