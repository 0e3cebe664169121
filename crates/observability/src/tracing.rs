//! Tracing/logging initialization.
//!
//! Logs always go to stderr so binaries can keep stdout for their report.

use tracing_subscriber::EnvFilter;

/// Env var selecting the log output format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "SALESDESK_LOG_FORMAT";

/// Output format of the fmt subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event (default).
    #[default]
    Json,
    /// Human-readable multi-line output for local debugging.
    Pretty,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }

    fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(LogFormat::from_env(), "info");
}

/// Initialize with an explicit format and a fallback filter used when
/// `RUST_LOG` is unset or invalid.
pub fn init_with(format: LogFormat, default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // try_init fails when a global subscriber already exists; that is the no-op case.
    let _ = match format {
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_pretty_aliases() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(" TEXT "), LogFormat::Pretty);
    }

    #[test]
    fn parse_falls_back_to_json() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Json);
        assert_eq!(LogFormat::parse(""), LogFormat::Json);
    }

    #[test]
    fn init_twice_is_a_no_op() {
        init_with(LogFormat::Json, "warn");
        init_with(LogFormat::Pretty, "debug");
    }
}
