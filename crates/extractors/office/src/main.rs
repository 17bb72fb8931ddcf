use std::path::Path;
use std::process;
use std::time::Duration;

use docfind_extract_office::{delimited, docx, is_csv, is_docx, is_legacy_doc, is_spreadsheet, legacy, sheet, LibreOffice};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: docfind-extract-office <file-path> [converter-timeout-secs]");
        eprintln!();
        eprintln!("Extracts text from DOCX, DOC, XLSX, XLS and CSV files and outputs it as a JSON string.");
        process::exit(1);
    }

    let name = &args[1];
    let path = Path::new(name);
    let timeout = Duration::from_secs(args.get(2).and_then(|s| s.parse().ok()).unwrap_or(60));

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            process::exit(1);
        }
    };

    let result = if is_docx(name) {
        docx::extract_from_bytes(&bytes)
    } else if is_spreadsheet(name) {
        sheet::extract_from_bytes(&bytes)
    } else if is_csv(name) {
        delimited::extract_from_bytes(&bytes)
    } else if is_legacy_doc(name) {
        legacy::extract_from_bytes(&bytes, &LibreOffice::platform_default(), timeout)
            .map_err(anyhow::Error::from)
    } else {
        eprintln!("Unsupported office format: {}", path.display());
        process::exit(1);
    };

    match result {
        Ok(text) => match serde_json::to_string_pretty(&text) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing to JSON: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error extracting {}: {:#}", path.display(), e);
            process::exit(1);
        }
    }
}
