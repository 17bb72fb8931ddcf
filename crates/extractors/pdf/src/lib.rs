use anyhow::{anyhow, bail};
use serde::Serialize;

use docfind_common::api::{extension_of, PageRef, Provenance, SearchMatch};
use docfind_common::query::{Query, MARK_CLOSE, MARK_OPEN};

/// A PDF's text, kept per page and split into layout blocks.
#[derive(Debug, Clone, Serialize)]
pub struct PagedDocument {
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// Full plain-text rendering of the page, `\n` line endings.
    pub text: String,
    pub blocks: Vec<Block>,
}

/// A maximal run of non-blank lines within a page.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    /// 1-based position of the block within its page.
    pub ordinal: usize,
    /// Page line (1-based) the block starts on.
    pub first_line: usize,
    pub text: String,
}

/// Check if a filename is a PDF.
pub fn accepts(name: &str) -> bool {
    extension_of(name) == "pdf"
}

/// Extract per-page text from PDF bytes.
///
/// pdf-extract can panic on malformed input; `catch_unwind` turns that into
/// an error so a batch search can continue with the other files.
pub fn extract_from_bytes(bytes: &[u8], name: &str) -> anyhow::Result<PagedDocument> {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));

    let pages = match result {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            tracing::warn!("PDF extraction error for {name}: {e}");
            bail!("PDF extraction error for {name}: {e}");
        }
        Err(_) => {
            tracing::warn!("PDF extraction panicked for {name}");
            return Err(anyhow!("PDF extraction panicked for {name}"));
        }
    };
    if pages.is_empty() {
        bail!("{name} has no pages");
    }

    Ok(PagedDocument {
        pages: pages
            .iter()
            .enumerate()
            .map(|(i, text)| page_from_text(i + 1, text))
            .collect(),
    })
}

/// Build a page from its raw text, detecting blocks.
///
/// pdf-extract opens every page with blank lines; those are dropped so that
/// line 1 is the first line with text on it.
pub fn page_from_text(number: usize, raw: &str) -> Page {
    let normalized = docfind_extract_text::normalize_line_endings(raw);
    let leading: usize = normalized
        .split_inclusive('\n')
        .take_while(|line| line.trim().is_empty())
        .map(str::len)
        .sum();
    let text = normalized[leading..].to_string();
    let blocks = split_blocks(&text);
    Page { number, text, blocks }
}

/// Split page text into blocks separated by blank lines.
pub fn split_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut first_line = 0;

    for (idx, line) in text.split('\n').enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(Block {
                    ordinal: blocks.len() + 1,
                    first_line,
                    text: current.join("\n"),
                });
                current.clear();
            }
            continue;
        }
        if current.is_empty() {
            first_line = idx + 1;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(Block {
            ordinal: blocks.len() + 1,
            first_line,
            text: current.join("\n"),
        });
    }
    blocks
}

/// Search a paged document.
///
/// Each page is first searched block by block. Only when no block of a page
/// matches is the page's full text searched instead, which catches phrases
/// that run across a block boundary. A page never reports both kinds.
///
/// Every match carries the page number and the page line it starts on;
/// `context_chars` characters on each side of the match go into the preview.
pub fn search(
    doc: &PagedDocument,
    query: &Query,
    origin: &Provenance,
    context_chars: usize,
) -> Vec<SearchMatch> {
    let mut results = Vec::new();
    for page in &doc.pages {
        let before = results.len();
        for block in &page.blocks {
            search_region(&block.text, block.first_line, page.number, query, origin, context_chars, &mut results);
        }
        if results.len() == before {
            search_region(&page.text, 1, page.number, query, origin, context_chars, &mut results);
        }
    }
    results
}

fn search_region(
    text: &str,
    first_line: usize,
    page: usize,
    query: &Query,
    origin: &Provenance,
    context_chars: usize,
    out: &mut Vec<SearchMatch>,
) {
    for m in query.regex().find_iter(text) {
        out.push(SearchMatch {
            file: origin.file.clone(),
            path: origin.path.clone(),
            page: PageRef::Number(page),
            line: first_line + text[..m.start()].matches('\n').count(),
            preview: preview(text, m.start(), m.end(), context_chars),
        });
    }
}

/// Window of `context_chars` characters either side of `text[start..end]`,
/// whitespace runs collapsed to single spaces, match wrapped in `<mark>`.
fn preview(text: &str, start: usize, end: usize, context_chars: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(context_chars.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let from = if context_chars == 0 { start } else { from };
    let to = text[end..]
        .char_indices()
        .nth(context_chars)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    let marked = format!(
        "{}{MARK_OPEN}{}{MARK_CLOSE}{}",
        &text[from..start],
        &text[start..end],
        &text[end..to]
    );
    marked.split_whitespace().collect::<Vec<_>>().join(" ")
}
