use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: docfind-extract-pdf <file-path>");
        eprintln!();
        eprintln!("Extracts per-page text and layout blocks from a PDF and outputs JSON.");
        process::exit(1);
    }

    let path = Path::new(&args[1]);
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            process::exit(1);
        }
    };

    match docfind_extract_pdf::extract_from_bytes(&bytes, &args[1]) {
        Ok(doc) => match serde_json::to_string_pretty(&doc) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing to JSON: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error extracting PDF from {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}
