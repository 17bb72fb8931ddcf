use std::borrow::Cow;

use docfind_common::api::extension_of;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Which decoder produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Decode raw bytes to text.
///
/// Strips a UTF-8 byte-order mark, then tries UTF-8 and falls back to
/// Latin-1. Latin-1 maps every byte to a code point, so this always
/// succeeds, but bytes that were really Windows-1252 or another legacy
/// code page come out mis-decoded. It is a best effort, not validation.
pub fn decode(bytes: &[u8]) -> (String, TextEncoding) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), TextEncoding::Utf8),
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), TextEncoding::Latin1),
    }
}

/// Rewrite `\r\n` and bare `\r` to `\n`. Line numbers everywhere downstream
/// are counted from `\n` alone, so this has to run before any search.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Decode and canonicalize line endings in one step.
pub fn normalize(bytes: &[u8]) -> String {
    let (text, encoding) = decode(bytes);
    if encoding != TextEncoding::Utf8 {
        tracing::debug!("input is not valid UTF-8, decoded as {encoding:?}");
    }
    if text.contains('\r') {
        normalize_line_endings(&text).into_owned()
    } else {
        text
    }
}

/// Extract a plain/source text upload.
pub fn extract_from_bytes(bytes: &[u8], _name: &str) -> anyhow::Result<String> {
    Ok(normalize(bytes))
}

/// Check whether a filename belongs to the plain/source text group.
pub fn accepts(name: &str) -> bool {
    is_text_ext(&extension_of(name))
}

/// Source code, markup, config and log formats searched as plain text.
pub fn is_text_ext(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "py" | "js" | "java" | "class" | "cpp" | "cc" | "cxx" | "hpp" | "hxx"
        | "cs" | "ts" | "tsx" | "go" | "c" | "h" | "php" | "phtml" | "sql" | "rs"
        | "rb" | "swift" | "kt" | "kts" | "r" | "pl" | "pm" | "dart" | "scala"
        | "sc" | "vb" | "asm" | "s" | "html" | "htm" | "css" | "m" | "mat" | "sh"
        | "bash" | "cls" | "cbl" | "cob" | "fs" | "fsi" | "fsx" | "ps1" | "plsql"
        | "scm" | "ss" | "tsql" | "cr" | "pro" | "vhd" | "vhdl" | "d" | "abap"
        | "txt" | "md" | "log" | "json" | "xml" | "yml" | "yaml" | "toml"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_with_bom() {
        let (text, enc) = decode(b"\xEF\xBB\xBFhello");
        assert_eq!(text, "hello");
        assert_eq!(enc, TextEncoding::Utf8);
    }

    #[test]
    fn test_latin1_fallback() {
        // "café" in Latin-1: 0xE9 is not valid UTF-8 on its own.
        let (text, enc) = decode(b"caf\xE9");
        assert_eq!(text, "café");
        assert_eq!(enc, TextEncoding::Latin1);
    }

    #[test]
    fn test_decode_never_fails() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let (text, _) = decode(&bytes);
        assert_eq!(text.chars().count(), 256);
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert!(matches!(normalize_line_endings("a\nb"), Cow::Borrowed(_)));
        assert_eq!(normalize(b"one\r\ntwo\r\r\nthree"), "one\ntwo\n\nthree");
    }

    #[test]
    fn test_accepts() {
        assert!(accepts("main.rs"));
        assert!(accepts("README.MD"));
        assert!(accepts("analysis.R"));
        assert!(accepts("server.log"));
        assert!(!accepts("report.pdf"));
        assert!(!accepts("data.csv"));
        assert!(!accepts("image.png"));
        assert!(!accepts("Makefile"));
    }
}
