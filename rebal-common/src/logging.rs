//! Logging utilities.
//!
//! Provides structured JSON or human-readable logging through
//! `tracing-subscriber`, plus run identifiers for correlating the log lines
//! of one planning run.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Build the EnvFilter.
///
/// `RUST_LOG` wins when set; otherwise the configured base level applies.
fn build_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new(log_level)
}

/// Initialize logging with the given configuration.
///
/// # Arguments
///
/// * `log_level` - Base log level (trace, debug, info, warn, error)
/// * `log_format` - Output format: "json" for structured JSON, "pretty" for human-readable
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_logging(log_level: &str, log_format: &str) {
    let filter = build_filter(log_level);

    let subscriber = tracing_subscriber::registry().with(filter);

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        let _ = subscriber.with(fmt_layer).try_init();
    }

    tracing::info!(
        log_level = %log_level,
        log_format = %log_format,
        "Logging initialized"
    );
}

/// Generate a new run ID for correlating one solve.
pub fn generate_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short form of a run ID for compact log lines.
pub fn short_id(run_id: &str) -> &str {
    run_id.get(..8).unwrap_or(run_id)
}

/// Create a tracing span for one planning run.
///
/// # Example
///
/// ```ignore
/// let span = solve_span!(run_id, stages = 3);
/// let _enter = span.enter();
/// // ... run the passes
/// ```
#[macro_export]
macro_rules! solve_span {
    ($run_id:expr) => {
        tracing::info_span!("solve", run_id = %$run_id)
    };
    ($run_id:expr, $($field:tt)*) => {
        tracing::info_span!("solve", run_id = %$run_id, $($field)*)
    };
}
