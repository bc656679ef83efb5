//! Rendering of workflow events into persisted log lines.
//!
//! The on-disk format is one structured line per log event,
//! `YYYY-MM-DD HH:MM:SS.mmm │ LEVEL │ msg`, with streaming LLM fragments
//! written raw between lines.

use crate::event_bus::Event;

/// Install a global `tracing` subscriber honoring `RUST_LOG`.
///
/// Intended for binaries and integration tests; library code only emits.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Renders an event to the text a sink should write. Fragments pass through
/// untouched; implementations only shape `Log` events.
pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &Event) -> String;
}

/// The default line formatter.
pub struct PlainFormatter;

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &Event) -> String {
        match event {
            Event::Log {
                when,
                level,
                module,
                message,
            } => {
                format!(
                    "{} │ {:<8} │ [{}] {}\n",
                    when.format("%Y-%m-%d %H:%M:%S%.3f"),
                    level.as_str(),
                    module,
                    message
                )
            }
            Event::Fragment { text } => text.clone(),
            Event::StreamEnd => "\n".to_string(),
        }
    }
}

/// Header block written at the top of each worker log file.
#[must_use]
pub fn file_header(name: &str) -> String {
    let bar = "=".repeat(100);
    format!(
        "{bar}\n{:^100}\n{bar}\nstarted: {}\nlog: {name}\n{bar}\n",
        "AlphaSolve worker log",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::LogLevel;

    #[test]
    fn log_lines_match_the_persisted_format() {
        let rendered = PlainFormatter.render_event(&Event::log(LogLevel::Info, "solver", "hello"));
        // e.g. "2026-08-01 10:30:00.123 │ INFO     │ [solver] hello\n"
        let parts: Vec<&str> = rendered.splitn(3, " │ ").collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), "2026-08-01 10:30:00.123".len());
        assert_eq!(parts[1], "INFO    ");
        assert_eq!(parts[2], "[solver] hello\n");
    }

    #[test]
    fn fragments_pass_through_raw() {
        let rendered = PlainFormatter.render_event(&Event::fragment("partial"));
        assert_eq!(rendered, "partial");
        assert_eq!(PlainFormatter.render_event(&Event::StreamEnd), "\n");
    }
}
