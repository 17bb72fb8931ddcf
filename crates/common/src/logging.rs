use std::sync::OnceLock;

use tracing::{field::Visit, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

static IGNORE_PATTERNS: OnceLock<Vec<regex::Regex>> = OnceLock::new();

/// Install the global subscriber: `RUST_LOG` (or `default_directives`) plus a
/// fmt layer on stderr that drops events matching the patterns later passed to
/// [`set_ignore_patterns`].
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(default_directives: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(LogIgnoreFilter),
        )
        .try_init();
}

/// Compile and activate the log-ignore patterns.
///
/// The first call wins; subsequent calls are silently ignored.
/// Returns an error if any pattern is not a valid regular expression.
pub fn set_ignore_patterns(patterns: &[String]) -> Result<(), regex::Error> {
    let compiled = patterns
        .iter()
        .map(|p| regex::Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;
    let _ = IGNORE_PATTERNS.set(compiled);
    Ok(())
}

fn is_ignored(patterns: &[regex::Regex], target: &str, message: &str) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let candidate = format!("{target}: {message}");
    patterns.iter().any(|p| p.is_match(&candidate))
}

// ── Per-layer filter ──────────────────────────────────────────────────────────

/// Drops events whose `"{target}: {message}"` line matches a `[log] ignore`
/// pattern. Typical candidates are pdf-extract's glyph and font warnings on
/// uploads that still extract fine, and tower_http's per-request lines when
/// the trace level is raised for one module only.
pub struct LogIgnoreFilter;

impl<S: Subscriber> tracing_subscriber::layer::Filter<S> for LogIgnoreFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &tracing::Event<'_>, _cx: &Context<'_, S>) -> bool {
        let Some(patterns) = IGNORE_PATTERNS.get() else {
            return true;
        };
        let mut text = EventText::default();
        event.record(&mut text);
        !is_ignored(patterns, text.target(event.metadata()), &text.message)
    }
}

/// The message of one event and, for records bridged from the `log` crate,
/// the crate that emitted it.
#[derive(Default)]
struct EventText {
    message: String,
    log_target: Option<String>,
}

impl EventText {
    /// Bridged records all share the target "log"; the originating crate is
    /// what ignore patterns are written against.
    fn target<'a>(&'a self, meta: &'a Metadata<'_>) -> &'a str {
        self.log_target.as_deref().unwrap_or_else(|| meta.target())
    }

    fn record(&mut self, field: &tracing::field::Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            "log.target" => self.log_target = Some(value),
            _ => {}
        }
    }
}

impl Visit for EventText {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ignored_matches_target_and_message() {
        let patterns = vec![regex::Regex::new("^pdf_extract: unknown glyph").unwrap()];
        assert!(is_ignored(&patterns, "pdf_extract", "unknown glyph name 'g12'"));
        assert!(!is_ignored(&patterns, "docfind_server", "unknown glyph name"));
        assert!(!is_ignored(&[], "pdf_extract", "unknown glyph"));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_filter_drops_matching_events() {
        set_ignore_patterns(&["^pdf_extract: unknown glyph".to_string()]).unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .with_filter(LogIgnoreFilter),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "pdf_extract", "unknown glyph name 'g12'");
            tracing::warn!(target: "pdf_extract", "missing font widths");
            tracing::warn!(target: "docfind_server", "unknown glyph in upload");
        });

        let out = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(!out.contains("g12"));
        assert!(out.contains("missing font widths"));
        assert!(out.contains("unknown glyph in upload"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(set_ignore_patterns(&["(unclosed".to_string()]).is_err());
    }
}
