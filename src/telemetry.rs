//! Tracing subscriber setup.
//!
//! Everything is driven by environment variables:
//! - `RUST_LOG` – full filter directive; wins over `AXUM_LOG_LEVEL`
//! - `AXUM_LOG_LEVEL` – trace|debug|info|warn|error (default: `debug`)
//! - `AXUM_SPAN_EVENTS` – `full`, `enter_exit`, or unset for close events only
//! - `FORCE_COLOR` – `1|true|yes` / `0|false|no`; otherwise TTY detection
//!
//! Close events carry span timing, so every `ingest` span logs how long the
//! upload took.

use std::env;

use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

// ---

/// Install the global subscriber. Call once, before any logging.
pub fn init_tracing() {
    // ---
    let span_events = span_events(env::var("AXUM_SPAN_EVENTS").ok().as_deref());
    let use_color = use_color(
        env::var("FORCE_COLOR").ok().as_deref(),
        std::io::stdout().is_terminal(),
    );

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_directive(env::var("AXUM_LOG_LEVEL").ok().as_deref()))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

fn span_events(mode: Option<&str>) -> FmtSpan {
    match mode {
        Some("full") => FmtSpan::FULL,
        Some("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    }
}

fn use_color(force: Option<&str>, is_tty: bool) -> bool {
    match force {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => is_tty,
    }
}

/// Filter directive for a log level name; SQL statement logging stays at warn.
fn default_directive(level: Option<&str>) -> String {
    let level = match level {
        Some(l @ ("trace" | "debug" | "info" | "warn" | "error")) => l,
        _ => "debug",
    };
    format!("{level},sqlx::query=warn")
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_span_events() {
        // ---
        assert_eq!(span_events(Some("full")), FmtSpan::FULL);
        assert_eq!(span_events(Some("enter_exit")), FmtSpan::ENTER | FmtSpan::EXIT);
        assert_eq!(span_events(None), FmtSpan::CLOSE);
        assert_eq!(span_events(Some("bogus")), FmtSpan::CLOSE);
    }

    #[test]
    fn test_color_override() {
        // ---
        assert!(use_color(Some("yes"), false));
        assert!(!use_color(Some("0"), true));
        assert!(use_color(None, true));
        assert!(!use_color(Some("maybe"), false));
    }

    #[test]
    fn test_default_directive() {
        // ---
        assert_eq!(default_directive(Some("info")), "info,sqlx::query=warn");
        assert_eq!(default_directive(Some("loud")), "debug,sqlx::query=warn");
        assert_eq!(default_directive(None), "debug,sqlx::query=warn");
    }
}
