mod folder;
mod search;
mod upload;
mod view;

pub use folder::open_folder;
pub use search::{search_stored, search_upload};
pub use upload::{store_file_temp, upload_for_view};
pub use view::{get_file, open_browser};

use std::fmt::Write as _;

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tokio::task::spawn_blocking;

use docfind_common::api::StatusResponse;
use docfind_common::DocError;

use crate::reveal::RevealError;

// ── Shared helpers ─────────────────────────────────────────────────────────────

/// An error leaving a handler: a status plus the `{"status":"error"}` envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn multipart(e: MultipartError) -> Self {
        Self::new(e.status(), e.body_text())
    }
}

impl From<DocError> for ApiError {
    fn from(e: DocError) -> Self {
        let status = match &e {
            DocError::NotFound => StatusCode::NOT_FOUND,
            DocError::UnsupportedFormat(_) | DocError::BadQuery(_) => StatusCode::BAD_REQUEST,
            DocError::Extraction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DocError::EnvironmentUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, e.to_string())
    }
}

impl From<RevealError> for ApiError {
    fn from(e: RevealError) -> Self {
        match e {
            RevealError::NoOriginalPath | RevealError::AmbiguousPath(_) => Self::bad_request(e.to_string()),
            RevealError::Headless => DocError::EnvironmentUnavailable(e.to_string()).into(),
            RevealError::Launch { .. } => {
                tracing::error!("open_folder: {e}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(StatusResponse::error(self.message))).into_response()
    }
}

/// Run extraction/search work off the async runtime.
pub(super) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DocError> + Send + 'static,
{
    match spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!("blocking task failed: {e}");
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred."))
        }
    }
}

/// `Content-Disposition` value carrying both an ASCII fallback name and the
/// UTF-8 name in RFC 5987 form.
pub(super) fn content_disposition(kind: &str, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') { c } else { '_' })
        .collect();
    let mut encoded = String::with_capacity(filename.len());
    for b in filename.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
            encoded.push(b as char);
        } else {
            let _ = write!(encoded, "%{b:02X}");
        }
    }
    format!("{kind}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
