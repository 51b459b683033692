//! Observability for the UCP MCP server.
//!
//! Configures structured logging for the server process. All log output
//! goes to stderr: on the stdio transport, stdout carries the MCP
//! protocol stream and must stay clean.

use std::io;

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development.
    Pretty,
    /// JSON format for production log aggregation.
    Json,
}

impl LogFormat {
    /// Determines the log format from the `LOG_FORMAT` environment
    /// variable: `json` selects JSON output, anything else (or unset)
    /// selects the pretty format.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").unwrap_or_default().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initializes the tracing subscriber for the server process.
///
/// The log level filter comes from `RUST_LOG` and defaults to `info`.
/// Span close events are emitted so that per-operation timing shows up
/// in the logs.
pub fn init_observability(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
        LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_defaults_to_pretty() {
        // LOG_FORMAT is unset in the test environment.
        if std::env::var("LOG_FORMAT").is_err() {
            assert_eq!(LogFormat::from_env(), LogFormat::Pretty);
        }
    }
}
