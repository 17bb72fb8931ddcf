use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Lower-cased extension of a filename, without the dot. Empty when the
/// name has none (`"Makefile"`, `".bashrc"`).
pub fn extension_of(name: &str) -> String {
    // Uploads from Windows clients may carry backslash-separated names.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => String::new(),
        Some(i) => base[i + 1..].to_lowercase(),
    }
}

/// Final path component of a declared path, used as the display name of a match.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).find(|s| !s.is_empty()).unwrap_or(path)
}

/// Page a match was found on. Flat documents have no pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRef {
    Number(usize),
    NotPaginated,
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Number(n) => write!(f, "{n}"),
            PageRef::NotPaginated => f.write_str("N/A"),
        }
    }
}

// The web UI expects a page number or the literal "N/A".
impl Serialize for PageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageRef::Number(n) => serializer.serialize_u64(*n as u64),
            PageRef::NotPaginated => serializer.serialize_str("N/A"),
        }
    }
}

/// One occurrence of a query inside one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    /// Display name of the file.
    pub file: String,
    /// Declared original path (falls back to the filename).
    pub path: String,
    pub page: PageRef,
    /// 1-based line. For flat documents this is the line in the whole text,
    /// for PDFs the line within the page's extracted text.
    pub line: usize,
    /// Context around the match with the matched span wrapped in `<mark>`.
    pub preview: String,
}

/// Provenance labels attached to every match of one document.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub file: String,
    pub path: String,
}

impl Provenance {
    /// `declared_path` falls back to `filename` when the client sent none.
    pub fn new(filename: &str, declared_path: Option<&str>) -> Self {
        let path = declared_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(filename)
            .to_string();
        Self {
            file: base_name(filename).to_string(),
            path,
        }
    }
}

/// A file that could not be searched; reported alongside the matches of the
/// files that could.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

/// POST /search_upload response.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: &'static str,
    pub matches: Vec<SearchMatch>,
    pub count: usize,
    pub failures: Vec<FileFailure>,
}

/// POST /upload_for_view and /store_file_temp response.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub file_id: String,
}

/// Generic `{status, message}` envelope used for errors and simple acks.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: "ok".into(), message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error".into(), message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.PDF"), "pdf");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("Makefile"), "");
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("dir.v2/notes"), "");
        assert_eq!(extension_of(r"C:\docs\Budget.XLSX"), "xlsx");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/home/a/notes.txt"), "notes.txt");
        assert_eq!(base_name(r"C:\a\b.doc"), "b.doc");
        assert_eq!(base_name("plain.md"), "plain.md");
    }

    #[test]
    fn test_provenance_falls_back_to_filename() {
        let p = Provenance::new("a.txt", None);
        assert_eq!(p.path, "a.txt");
        let p = Provenance::new("a.txt", Some("  "));
        assert_eq!(p.path, "a.txt");
        let p = Provenance::new("a.txt", Some("/src/a.txt"));
        assert_eq!(p.path, "/src/a.txt");
        assert_eq!(p.file, "a.txt");
    }

    #[test]
    fn test_page_ref_serialization() {
        let m = SearchMatch {
            file: "a".into(),
            path: "a".into(),
            page: PageRef::NotPaginated,
            line: 3,
            preview: String::new(),
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["page"], "N/A");
        assert_eq!(v["line"], 3);

        let v = serde_json::to_value(PageRef::Number(7)).unwrap();
        assert_eq!(v, 7);
    }
}
