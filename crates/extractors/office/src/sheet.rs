use std::io::Cursor;

use anyhow::Context;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};

/// A worksheet already reduced to rendered cell strings.
pub struct SheetRows {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Extract an XLSX/XLS workbook: for each worksheet a header line
/// `===== Worksheet: <name> =====` followed by one line per row, cells
/// joined by tabs. Sheets after the first are preceded by a blank line.
pub fn extract_from_bytes(bytes: &[u8]) -> anyhow::Result<String> {
    let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .context("not a readable workbook")?;

    let mut sheets = Vec::new();
    for name in wb.sheet_names() {
        let range = wb
            .worksheet_range(&name)
            .with_context(|| format!("reading worksheet '{name}'"))?;
        // Ranges begin at the first used cell; rows and columns before it are
        // kept blank so each line still lines up with a worksheet row.
        let (skip_rows, skip_cols) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); skip_rows as usize];
        rows.extend(range.rows().map(|row| {
            std::iter::repeat(String::new())
                .take(skip_cols as usize)
                .chain(row.iter().map(cell_text))
                .collect()
        }));
        sheets.push(SheetRows { name, rows });
    }
    Ok(render_sheets(&sheets))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string().trim().to_string(),
        },
        other => other.to_string().trim().to_string(),
    }
}

pub fn render_sheets(sheets: &[SheetRows]) -> String {
    let mut lines = Vec::new();
    for (i, sheet) in sheets.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("===== Worksheet: {} =====", sheet.name));
        lines.extend(sheet.rows.iter().map(|row| row.join("\t")));
    }
    lines.join("\n")
}
