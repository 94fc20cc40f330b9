//! Tracing setup.
//!
//! - LOG_LEVEL: EnvFilter directives; defaults to
//!   "info,planner=debug,lesson_planner=debug,tower_http=info,axum=info".
//! - LOG_FORMAT: "pretty" (default), "compact" or "json".
//! - LOG_SPAN_CLOSE=1 also emits an event when an instrumented span closes,
//!   which gives per-call timings for model requests and exports.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,planner=debug,lesson_planner=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let span_events = match std::env::var("LOG_SPAN_CLOSE").as_deref() {
        Ok("1") | Ok("true") => FmtSpan::CLOSE,
        _ => FmtSpan::NONE,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Each format has its own builder type, so init in each arm.
    match LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref()) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}
