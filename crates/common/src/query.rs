use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::api::{PageRef, Provenance, SearchMatch};
use crate::error::DocError;

pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";

/// A compiled user query.
///
/// The raw text is split on whitespace, each token is escaped so it only
/// ever matches literally, and the tokens are re-joined with `\s+`. The
/// result is case-insensitive, so `"hello   world"` and `"hello\nworld"`
/// both match the query `hello world`.
#[derive(Debug, Clone)]
pub struct Query {
    raw: String,
    regex: Regex,
}

impl Query {
    pub fn parse(raw: &str) -> Result<Self, DocError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DocError::BadQuery("missing search query".into()));
        }
        let pattern = raw
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| DocError::BadQuery(format!("invalid query pattern: {e}")))?;
        Ok(Self { raw: raw.to_string(), regex })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Search a flat (line-oriented) document.
///
/// `text` must already have `\n`-only line endings. Matches are reported in
/// document order; each carries the 1-based line the match starts on and that
/// full line as preview, with the first case-insensitive occurrence of the
/// matched text marked. When the same text occurs twice on one line, the
/// first occurrence is marked for both matches.
pub fn search_flat(text: &str, query: &Query, origin: &Provenance) -> Vec<SearchMatch> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut results = Vec::new();
    let mut line_number = 1;
    let mut scanned = 0;
    let mut markers = Markers::default();

    for m in query.regex().find_iter(text) {
        line_number += text[scanned..m.start()].matches('\n').count();
        scanned = m.start();

        let matched = m.as_str();
        let line_text = lines.get(line_number - 1).copied().unwrap_or(matched);

        results.push(SearchMatch {
            file: origin.file.clone(),
            path: origin.path.clone(),
            page: PageRef::NotPaginated,
            line: line_number,
            preview: markers.mark_first(line_text, matched),
        });
    }
    results
}

/// Case-insensitive literal patterns for matched texts, compiled once per
/// distinct text.
#[derive(Default)]
struct Markers {
    compiled: HashMap<String, Option<Regex>>,
}

impl Markers {
    /// Wrap the first case-insensitive occurrence of `needle` in `haystack`.
    /// Returns `haystack` unchanged when it does not contain `needle` (a match
    /// that spans lines, for example).
    fn mark_first(&mut self, haystack: &str, needle: &str) -> String {
        let re = self.compiled.entry(needle.to_string()).or_insert_with(|| {
            RegexBuilder::new(&regex::escape(needle))
                .case_insensitive(true)
                .build()
                .ok()
        });
        match re.as_ref().and_then(|re| re.find(haystack)) {
            Some(m) => format!(
                "{}{MARK_OPEN}{}{MARK_CLOSE}{}",
                &haystack[..m.start()],
                m.as_str(),
                &haystack[m.end()..]
            ),
            None => haystack.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Provenance {
        Provenance::new("notes.txt", Some("/home/u/notes.txt"))
    }

    #[test]
    fn test_empty_query_is_bad_query() {
        assert!(matches!(Query::parse(""), Err(DocError::BadQuery(_))));
        assert!(matches!(Query::parse("   \t\n"), Err(DocError::BadQuery(_))));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let q = Query::parse("a.b (c)").unwrap();
        assert!(q.regex().is_match("x a.b  (c) y"));
        assert!(!q.regex().is_match("axb (c)"));
        let q = Query::parse("[").unwrap();
        assert!(q.regex().is_match("array[0]"));
    }

    #[test]
    fn test_line_number() {
        let q = Query::parse("ccc").unwrap();
        let m = search_flat("a\nbb\nccc", &q, &origin());
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].line, 3);
        assert_eq!(m[0].page, PageRef::NotPaginated);
        assert_eq!(m[0].preview, "<mark>ccc</mark>");
        assert_eq!(m[0].path, "/home/u/notes.txt");
        assert_eq!(m[0].file, "notes.txt");
    }

    #[test]
    fn test_phrase_spans_whitespace_and_newlines() {
        let q = Query::parse("foo bar").unwrap();
        let m = search_flat("start\nfoo\n  bar end", &q, &origin());
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].line, 2);
        // The matched text crosses a newline, so the line itself carries no mark.
        assert_eq!(m[0].preview, "foo");

        let m = search_flat("FOO    Bar", &q, &origin());
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].preview, "<mark>FOO    Bar</mark>");
    }

    #[test]
    fn test_document_order_and_case_insensitivity() {
        let q = Query::parse("Needle").unwrap();
        let text = "needle one\nnothing\nNEEDLE two\nneedle";
        let lines: Vec<usize> = search_flat(text, &q, &origin()).iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![1, 3, 4]);
    }

    #[test]
    fn test_second_occurrence_marks_first() {
        let q = Query::parse("ab").unwrap();
        let m = search_flat("xx ab yy AB", &q, &origin());
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].preview, "xx <mark>ab</mark> yy AB");
        assert_eq!(m[1].preview, "xx <mark>ab</mark> yy AB");
    }

    #[test]
    fn test_markers_compiled_once_per_text() {
        let mut markers = Markers::default();
        assert_eq!(markers.mark_first("an ERROR here", "error"), "an <mark>ERROR</mark> here");
        assert_eq!(markers.mark_first("error, error", "error"), "<mark>error</mark>, error");
        assert_eq!(markers.mark_first("no hit", "error"), "no hit");
        assert_eq!(markers.mark_first("Error!", "Error"), "<mark>Error</mark>!");
        assert_eq!(markers.compiled.len(), 2);
    }

    #[test]
    fn test_many_matches_in_large_text() {
        let q = Query::parse("timeout").unwrap();
        let text = (0..500)
            .map(|i| if i % 2 == 0 { format!("{i} TIMEOUT reached") } else { format!("{i} ok") })
            .collect::<Vec<_>>()
            .join("\n");
        let m = search_flat(&text, &q, &origin());
        assert_eq!(m.len(), 250);
        assert_eq!(m[0].line, 1);
        assert_eq!(m[249].line, 499);
        assert_eq!(m[249].preview, "498 <mark>TIMEOUT</mark> reached");
    }

    #[test]
    fn test_no_match() {
        let q = Query::parse("absent").unwrap();
        assert!(search_flat("some text\nmore", &q, &origin()).is_empty());
    }
}
