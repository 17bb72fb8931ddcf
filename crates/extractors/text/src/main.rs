use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: docfind-extract-text <file-path>");
        eprintln!();
        eprintln!("Decodes a text file (UTF-8 with Latin-1 fallback), canonicalizes");
        eprintln!("line endings and prints the result as a JSON string.");
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

    match docfind_extract_text::extract_from_bytes(&bytes, &args[1]) {
        Ok(text) => match serde_json::to_string_pretty(&text) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing to JSON: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error extracting text from {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}
