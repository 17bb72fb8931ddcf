use anyhow::anyhow;

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Extract a CSV upload as tab-separated text, header row first.
///
/// The delimiter is sniffed from the first non-empty line. Rows wider than
/// the header are skipped, shorter ones padded with empty cells. When the
/// content cannot be parsed at all the decoded text is returned as is.
pub fn extract_from_bytes(bytes: &[u8]) -> anyhow::Result<String> {
    let text = docfind_extract_text::normalize(bytes);
    match to_tab_separated(&text) {
        Ok(tsv) => Ok(tsv),
        Err(e) => {
            tracing::warn!("CSV parse failed, falling back to raw text: {e:#}");
            Ok(text)
        }
    }
}

fn to_tab_separated(text: &str) -> anyhow::Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut width = None;
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        let width = *width.get_or_insert(record.len());
        if record.len() > width {
            skipped += 1;
            continue;
        }
        let mut fields: Vec<&str> = record.iter().collect();
        fields.resize(width, "");
        writer.write_record(&fields)?;
    }
    if skipped > 0 {
        tracing::debug!("skipped {skipped} CSV rows wider than the header");
    }

    let out = writer.into_inner().map_err(|e| anyhow!("{}", e.error()))?;
    Ok(String::from_utf8(out)?)
}

/// Pick the candidate delimiter occurring most often (outside quotes) in
/// the first non-empty line. Defaults to a comma.
fn sniff_delimiter(text: &str) -> u8 {
    let Some(line) = text.lines().find(|l| !l.trim().is_empty()) else {
        return b',';
    };
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = CANDIDATE_DELIMITERS.iter().position(|&d| d == b) {
                counts[i] += 1;
            }
        }
    }
    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CANDIDATE_DELIMITERS[best]
}
