//! Office-family extractors: DOCX, legacy DOC (via an external converter),
//! XLSX/XLS workbooks and CSV. Each one flattens its document into a single
//! `\n`-separated string.

pub mod delimited;
pub mod docx;
pub mod legacy;
pub mod sheet;

use docfind_common::api::extension_of;

pub use legacy::{ConvertError, DocConverter, LibreOffice};

pub fn is_docx(name: &str) -> bool {
    extension_of(name) == "docx"
}

pub fn is_legacy_doc(name: &str) -> bool {
    extension_of(name) == "doc"
}

pub fn is_spreadsheet(name: &str) -> bool {
    matches!(extension_of(name).as_str(), "xlsx" | "xls")
}

pub fn is_csv(name: &str) -> bool {
    extension_of(name) == "csv"
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups() {
        assert!(is_docx("report.DOCX"));
        assert!(is_legacy_doc("old.doc"));
        assert!(!is_legacy_doc("new.docx"));
        assert!(is_spreadsheet("data.xlsx"));
        assert!(is_spreadsheet("data.XLS"));
        assert!(!is_spreadsheet("data.xlsm"));
        assert!(is_csv("export.csv"));
        assert!(!is_csv("export.tsv"));
    }
}
