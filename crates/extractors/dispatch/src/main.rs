use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use docfind_common::config::ExtractSettings;
use docfind_common::Query;
use docfind_extract_dispatch::{Dispatcher, SourceFile};

/// Search local documents for a phrase, the same way the server searches uploads.
#[derive(Parser)]
#[command(name = "docfind-search", version)]
struct Args {
    /// Phrase to look for; whitespace between words matches any whitespace.
    query: String,

    /// Files to search, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Legacy .doc converter executable.
    #[arg(long)]
    converter: Option<String>,

    /// Seconds before a .doc conversion is abandoned.
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    docfind_common::logging::init("warn");

    let query = Query::parse(&args.query)?;
    let settings = ExtractSettings {
        converter: args.converter,
        converter_timeout_secs: args.timeout,
        ..ExtractSettings::default()
    };
    let dispatcher = Dispatcher::from_settings(&settings);

    let mut loaded = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let declared = std::fs::canonicalize(path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string());
        loaded.push((name, declared, data));
    }

    let files: Vec<SourceFile<'_>> = loaded
        .iter()
        .map(|(name, declared, data)| SourceFile {
            name,
            declared_path: Some(declared.as_str()),
            data,
        })
        .collect();

    let report = dispatcher.search_files(&query, &files);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
