use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, warn};

use docfind_common::api::{extension_of, FileFailure, Provenance, SearchMatch};
use docfind_common::config::ExtractSettings;
use docfind_common::query::{search_flat, Query};
use docfind_common::DocError;
use docfind_extract_office::{DocConverter, LibreOffice};
use docfind_extract_pdf::PagedDocument;

/// The format group of a file, resolved once from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PlainText,
    Pdf,
    Docx,
    LegacyDoc,
    Spreadsheet,
    Csv,
    Unsupported,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        if docfind_extract_pdf::accepts(name) {
            FileKind::Pdf
        } else if docfind_extract_office::is_docx(name) {
            FileKind::Docx
        } else if docfind_extract_office::is_legacy_doc(name) {
            FileKind::LegacyDoc
        } else if docfind_extract_office::is_spreadsheet(name) {
            FileKind::Spreadsheet
        } else if docfind_extract_office::is_csv(name) {
            FileKind::Csv
        } else if docfind_extract_text::accepts(name) {
            FileKind::PlainText
        } else {
            FileKind::Unsupported
        }
    }
}

/// Searchable content of one file.
#[derive(Debug, Clone)]
pub enum ExtractedDocument {
    /// Line-oriented text with `\n` line endings.
    Flat(String),
    Paged(PagedDocument),
}

impl ExtractedDocument {
    pub fn search(&self, query: &Query, origin: &Provenance, context_chars: usize) -> Vec<SearchMatch> {
        match self {
            ExtractedDocument::Flat(text) => search_flat(text, query, origin),
            ExtractedDocument::Paged(doc) => docfind_extract_pdf::search(doc, query, origin, context_chars),
        }
    }
}

/// Turns the raw bytes of one format into searchable content.
pub trait Extractor: Send + Sync {
    fn extract(&self, bytes: &[u8], name: &str) -> Result<ExtractedDocument, DocError>;
}

/// An extractor whose whole output is one flat text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8], name: &str) -> Result<String, DocError>;
}

impl<T: TextExtractor> Extractor for T {
    fn extract(&self, bytes: &[u8], name: &str) -> Result<ExtractedDocument, DocError> {
        self.extract_text(bytes, name).map(ExtractedDocument::Flat)
    }
}

struct PlainTextExtractor;
struct PdfExtractor;
struct DocxExtractor;
struct SpreadsheetExtractor;
struct CsvExtractor;

struct LegacyDocExtractor {
    converter: Arc<dyn DocConverter>,
    timeout: Duration,
}

fn text_or_failure(name: &str, result: anyhow::Result<String>) -> Result<String, DocError> {
    result.map_err(|e| DocError::extraction(name, format!("{e:#}")))
}

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8], name: &str) -> Result<String, DocError> {
        text_or_failure(name, docfind_extract_text::extract_from_bytes(bytes, name))
    }
}

impl Extractor for PdfExtractor {
    fn extract(&self, bytes: &[u8], name: &str) -> Result<ExtractedDocument, DocError> {
        docfind_extract_pdf::extract_from_bytes(bytes, name)
            .map(ExtractedDocument::Paged)
            .map_err(|e| DocError::extraction(name, format!("{e:#}")))
    }
}

impl TextExtractor for DocxExtractor {
    fn extract_text(&self, bytes: &[u8], name: &str) -> Result<String, DocError> {
        text_or_failure(name, docfind_extract_office::docx::extract_from_bytes(bytes))
    }
}

impl TextExtractor for SpreadsheetExtractor {
    fn extract_text(&self, bytes: &[u8], name: &str) -> Result<String, DocError> {
        text_or_failure(name, docfind_extract_office::sheet::extract_from_bytes(bytes))
    }
}

impl TextExtractor for CsvExtractor {
    fn extract_text(&self, bytes: &[u8], name: &str) -> Result<String, DocError> {
        text_or_failure(name, docfind_extract_office::delimited::extract_from_bytes(bytes))
    }
}

impl TextExtractor for LegacyDocExtractor {
    fn extract_text(&self, bytes: &[u8], name: &str) -> Result<String, DocError> {
        docfind_extract_office::legacy::extract_from_bytes(bytes, self.converter.as_ref(), self.timeout)
            .map_err(|e| {
                docfind_extract_office::legacy::log_failure(name, &e);
                DocError::extraction(name, e)
            })
    }
}

/// What to send back when a stored file is opened for viewing.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewContent {
    /// Shown in the browser as is (PDF viewer).
    Inline { data: Arc<[u8]>, mime: String },
    /// Text rendering of a rich document.
    Text(String),
    /// Offered as a download.
    Attachment { data: Arc<[u8]>, mime: String },
}

/// One file taking part in a multi-file search.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    pub name: &'a str,
    /// Path the client says the file came from; the name is used when absent.
    pub declared_path: Option<&'a str>,
    pub data: &'a [u8],
}

#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub matches: Vec<SearchMatch>,
    /// Sum of matches over the files that could be searched.
    pub count: usize,
    pub failures: Vec<FileFailure>,
}

/// Routes files to the extractor and search strategy for their format.
pub struct Dispatcher {
    legacy: LegacyDocExtractor,
    context_chars: usize,
}

impl Dispatcher {
    pub fn new(converter: Arc<dyn DocConverter>, converter_timeout: Duration, context_chars: usize) -> Self {
        Self {
            legacy: LegacyDocExtractor { converter, timeout: converter_timeout },
            context_chars,
        }
    }

    pub fn from_settings(settings: &ExtractSettings) -> Self {
        let converter = match &settings.converter {
            Some(program) => LibreOffice::new(program.clone()),
            None => LibreOffice::platform_default(),
        };
        Self::new(
            Arc::new(converter),
            settings.converter_timeout(),
            settings.preview_context_chars,
        )
    }

    fn extractor(&self, kind: FileKind) -> Option<&dyn Extractor> {
        let extractor: &dyn Extractor = match kind {
            FileKind::PlainText => &PlainTextExtractor,
            FileKind::Pdf => &PdfExtractor,
            FileKind::Docx => &DocxExtractor,
            FileKind::LegacyDoc => &self.legacy,
            FileKind::Spreadsheet => &SpreadsheetExtractor,
            FileKind::Csv => &CsvExtractor,
            FileKind::Unsupported => return None,
        };
        Some(extractor)
    }

    /// Extractors for formats that are viewed as their extracted text.
    fn text_extractor(&self, kind: FileKind) -> Option<&dyn TextExtractor> {
        let extractor: &dyn TextExtractor = match kind {
            FileKind::Docx => &DocxExtractor,
            FileKind::LegacyDoc => &self.legacy,
            FileKind::Spreadsheet => &SpreadsheetExtractor,
            FileKind::Csv => &CsvExtractor,
            FileKind::PlainText | FileKind::Pdf | FileKind::Unsupported => return None,
        };
        Some(extractor)
    }

    /// Extract a file for searching. Fails fast on unsupported formats and
    /// reports flat extractions that yield no text as extraction failures.
    pub fn extract_for_search(&self, data: &[u8], name: &str) -> Result<ExtractedDocument, DocError> {
        let kind = FileKind::from_name(name);
        let extractor = self
            .extractor(kind)
            .ok_or_else(|| unsupported(name))?;
        let doc = extractor.extract(data, name)?;
        if let ExtractedDocument::Flat(text) = &doc {
            if text.is_empty() {
                return Err(DocError::extraction(name, "no text content"));
            }
        }
        Ok(doc)
    }

    /// Decide how a stored file is shown: PDFs inline, rich documents as
    /// text, source files as a typed download, everything else as an
    /// opaque binary download.
    pub fn extract_for_view(&self, data: Arc<[u8]>, name: &str) -> Result<ViewContent, DocError> {
        let kind = FileKind::from_name(name);
        match kind {
            FileKind::Pdf => Ok(ViewContent::Inline { data, mime: "application/pdf".into() }),
            FileKind::PlainText => Ok(ViewContent::Attachment {
                data,
                mime: mime_guess::from_path(name).first_or_octet_stream().to_string(),
            }),
            _ => match self.text_extractor(kind) {
                Some(extractor) => extractor.extract_text(&data, name).map(ViewContent::Text),
                None => Ok(ViewContent::Attachment {
                    data,
                    mime: "application/octet-stream".into(),
                }),
            },
        }
    }

    /// Search a single file.
    pub fn search_file(&self, query: &Query, file: &SourceFile<'_>) -> Result<Vec<SearchMatch>, DocError> {
        let origin = Provenance::new(file.name, file.declared_path);
        let doc = self.extract_for_search(file.data, file.name)?;
        Ok(doc.search(query, &origin, self.context_chars))
    }

    /// Search several files in order, concatenating their matches.
    ///
    /// A file that cannot be searched is logged and listed in `failures`;
    /// it does not stop the others.
    pub fn search_files(&self, query: &Query, files: &[SourceFile<'_>]) -> SearchReport {
        let mut matches = Vec::new();
        let mut failures = Vec::new();

        for file in files {
            match self.search_file(query, file) {
                Ok(found) => matches.extend(found),
                Err(e) => {
                    match &e {
                        DocError::UnsupportedFormat(_) => warn!("skipping {}: {e}", file.name),
                        _ => error!("failed to process file {}: {e}", file.name),
                    }
                    failures.push(FileFailure {
                        file: file.name.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        SearchReport {
            count: matches.len(),
            matches,
            failures,
        }
    }
}

fn unsupported(name: &str) -> DocError {
    let ext = extension_of(name);
    DocError::UnsupportedFormat(if ext.is_empty() { "(none)".into() } else { format!(".{ext}") })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use docfind_common::api::PageRef;
    use docfind_extract_office::ConvertError;

    use super::*;

    /// Writes a fixed text next to the input, the way LibreOffice would.
    struct FixedTextConverter(&'static str);

    impl DocConverter for FixedTextConverter {
        fn convert(&self, input: &Path, out_dir: &Path, _timeout: Duration) -> Result<(), ConvertError> {
            let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
            std::fs::write(out_dir.join(format!("{stem}.txt")), self.0)?;
            Ok(())
        }
    }

    struct MissingConverter;

    impl DocConverter for MissingConverter {
        fn convert(&self, _input: &Path, _out_dir: &Path, _timeout: Duration) -> Result<(), ConvertError> {
            Err(ConvertError::NotFound("libreoffice".into()))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(FixedTextConverter("legacy memo\r\nwith a needle inside")),
            Duration::from_secs(5),
            50,
        )
    }

    fn file<'a>(name: &'a str, data: &'a [u8]) -> SourceFile<'a> {
        SourceFile { name, declared_path: None, data }
    }

    #[test]
    fn test_file_kind_from_name() {
        assert_eq!(FileKind::from_name("a.PDF"), FileKind::Pdf);
        assert_eq!(FileKind::from_name("a.docx"), FileKind::Docx);
        assert_eq!(FileKind::from_name("a.doc"), FileKind::LegacyDoc);
        assert_eq!(FileKind::from_name("a.xlsx"), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_name("a.xls"), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_name("a.csv"), FileKind::Csv);
        assert_eq!(FileKind::from_name("main.rs"), FileKind::PlainText);
        assert_eq!(FileKind::from_name("image.png"), FileKind::Unsupported);
        assert_eq!(FileKind::from_name("Makefile"), FileKind::Unsupported);
    }

    #[test]
    fn test_unsupported_is_an_error_not_zero_matches() {
        let q = Query::parse("anything").unwrap();
        let err = dispatcher().search_file(&q, &file("image.png", b"\x89PNG")).unwrap_err();
        assert!(matches!(err, DocError::UnsupportedFormat(ref ext) if ext == ".png"));
    }

    #[test]
    fn test_plain_text_search() {
        let q = Query::parse("ccc").unwrap();
        let f = SourceFile { name: "abc.txt", declared_path: Some("/tmp/abc.txt"), data: b"a\r\nbb\r\nccc" };
        let m = dispatcher().search_file(&q, &f).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].line, 3);
        assert_eq!(m[0].page, PageRef::NotPaginated);
        assert_eq!(m[0].path, "/tmp/abc.txt");
    }

    #[test]
    fn test_legacy_doc_through_converter() {
        let q = Query::parse("needle").unwrap();
        let m = dispatcher().search_file(&q, &file("memo.doc", b"\xD0\xCF\x11\xE0")).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].line, 2);
        assert_eq!(m[0].preview, "with a <mark>needle</mark> inside");
    }

    #[test]
    fn test_missing_converter_is_extraction_failure() {
        let d = Dispatcher::new(Arc::new(MissingConverter), Duration::from_secs(5), 50);
        let q = Query::parse("x").unwrap();
        let err = d.search_file(&q, &file("memo.doc", b"doc")).unwrap_err();
        assert!(matches!(err, DocError::Extraction { .. }));
    }

    #[test]
    fn test_empty_text_is_extraction_failure() {
        let q = Query::parse("x").unwrap();
        let err = dispatcher().search_file(&q, &file("empty.txt", b"")).unwrap_err();
        assert!(matches!(err, DocError::Extraction { .. }));
    }

    #[test]
    fn test_failure_isolation() {
        let q = Query::parse("needle").unwrap();
        let files = [
            file("one.txt", b"needle\nhay\nneedle"),
            file("two.pdf", b"%PDF-1.7 corrupted beyond repair"),
            file("three.csv", b"item,note\n1,a needle\n"),
        ];
        let report = dispatcher().search_files(&q, &files);

        assert_eq!(report.count, 3);
        assert_eq!(report.matches.len(), 3);
        let sources: Vec<&str> = report.matches.iter().map(|m| m.file.as_str()).collect();
        assert_eq!(sources, vec!["one.txt", "one.txt", "three.csv"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file, "two.pdf");

        // The CSV was re-serialized with tabs and searched as flat text.
        assert_eq!(report.matches[2].line, 2);
        assert_eq!(report.matches[2].preview, "1\ta <mark>needle</mark>");
    }

    #[test]
    fn test_view_text_formats() {
        let d = dispatcher();
        match d.extract_for_view(Arc::from(&b"\xD0\xCF\x11\xE0"[..]), "memo.doc").unwrap() {
            ViewContent::Text(text) => {
                assert!(text.starts_with("legacy memo"));
                assert!(text.contains("needle"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = d
            .extract_for_view(Arc::from(&b"not a zip"[..]), "broken.docx")
            .unwrap_err();
        assert!(matches!(err, DocError::Extraction { .. }));
    }

    #[test]
    fn test_view_routing() {
        let d = dispatcher();
        let data: Arc<[u8]> = Arc::from(&b"%PDF-1.4"[..]);
        match d.extract_for_view(data.clone(), "r.pdf").unwrap() {
            ViewContent::Inline { mime, .. } => assert_eq!(mime, "application/pdf"),
            other => panic!("unexpected {other:?}"),
        }

        let csv: Arc<[u8]> = Arc::from(&b"a,b\n1,2\n"[..]);
        assert_eq!(d.extract_for_view(csv, "t.csv").unwrap(), ViewContent::Text("a\tb\n1\t2\n".into()));

        let json: Arc<[u8]> = Arc::from(&b"{}"[..]);
        match d.extract_for_view(json, "c.json").unwrap() {
            ViewContent::Attachment { mime, .. } => assert_eq!(mime, "application/json"),
            other => panic!("unexpected {other:?}"),
        }

        let png: Arc<[u8]> = Arc::from(&b"\x89PNG"[..]);
        match d.extract_for_view(png, "image.png").unwrap() {
            ViewContent::Attachment { mime, .. } => assert_eq!(mime, "application/octet-stream"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
