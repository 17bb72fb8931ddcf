use thiserror::Error;

/// Every failure the extraction/search core reports to a caller.
///
/// All variants are recoverable at the request boundary; none of them
/// should ever take the process down.
#[derive(Debug, Error)]
pub enum DocError {
    /// Unknown or expired file identifier.
    #[error("file not found or has expired")]
    NotFound,

    /// Extension outside every recognized group.
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// The extractor ran but produced no usable text.
    #[error("could not read content from {name}: {reason}")]
    Extraction { name: String, reason: String },

    #[error("{0}")]
    BadQuery(String),

    /// Requested a desktop-only operation without a desktop shell.
    #[error("{0}")]
    EnvironmentUnavailable(String),
}

impl DocError {
    pub fn extraction(name: &str, reason: impl ToString) -> Self {
        DocError::Extraction {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
