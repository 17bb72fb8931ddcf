use std::io::{Cursor, Read};

use anyhow::Context;
use quick_xml::events::Event;

/// Extract body text from a DOCX: one line per paragraph of
/// `word/document.xml`, in document order.
pub fn extract_from_bytes(bytes: &[u8]) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).context("not a DOCX container")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("missing word/document.xml")?
        .read_to_string(&mut xml)?;
    Ok(parse_docx_paragraphs(&xml)?.join("\n"))
}

/// Collect paragraphs from word/document.xml.
///
/// Empty paragraphs are kept so line numbers follow the visible layout.
/// Paragraphs nested inside another (text boxes) merge into the outer one.
fn parse_docx_paragraphs(xml: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current_para = String::new();
    let mut depth = 0usize;
    let mut in_t = false;

    loop {
        match reader.read_event().context("malformed word/document.xml")? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_t = true,
                b"w:p" => {
                    if depth == 0 {
                        current_para.clear();
                    }
                    depth += 1;
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" if depth == 0 => paragraphs.push(String::new()),
                b"w:tab" if depth > 0 => current_para.push('\t'),
                b"w:br" | b"w:cr" if depth > 0 => current_para.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_t = false,
                b"w:p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        paragraphs.push(std::mem::take(&mut current_para));
                    }
                }
                _ => {}
            },
            Event::Text(e) => {
                if in_t {
                    current_para.push_str(&e.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}
