//! Logging initialization for the build step.
//!
//! The CI system selects the format through `ESTAFETTE_LOG_FORMAT`; the
//! level comes from `RUST_LOG` when set, else from the configuration.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How log lines are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// JSON lines
    Json,
    /// Multi-line human-readable output
    Pretty,
    /// Single-line human-readable output
    Compact,
}

impl LogStyle {
    /// Maps a configured log format onto a style.
    ///
    /// * `json`, `stackdriver`, `v3` - JSON lines
    /// * `pretty`, `console` - pretty
    /// * `plaintext` - compact
    pub fn from_format(format: &str) -> Option<Self> {
        match format {
            "json" | "stackdriver" | "v3" => Some(Self::Json),
            "pretty" | "console" => Some(Self::Pretty),
            "plaintext" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
pub fn init_tracing(log_format: &str, log_level: &str) -> Result<()> {
    let style = LogStyle::from_format(log_format).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown log format '{}', expected one of plaintext, console, pretty, json, stackdriver, v3",
            log_format
        )
    })?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match style {
        LogStyle::Json => registry.with(fmt.json()).try_init(),
        LogStyle::Pretty => registry.with(fmt.pretty()).try_init(),
        LogStyle::Compact => registry.with(fmt.compact()).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_style_from_known_formats() {
        assert_eq!(LogStyle::from_format("json"), Some(LogStyle::Json));
        assert_eq!(LogStyle::from_format("stackdriver"), Some(LogStyle::Json));
        assert_eq!(LogStyle::from_format("v3"), Some(LogStyle::Json));
        assert_eq!(LogStyle::from_format("console"), Some(LogStyle::Pretty));
        assert_eq!(LogStyle::from_format("pretty"), Some(LogStyle::Pretty));
        assert_eq!(LogStyle::from_format("plaintext"), Some(LogStyle::Compact));
    }

    #[test]
    fn log_style_rejects_unknown_format() {
        assert_eq!(LogStyle::from_format("xml"), None);
        assert_eq!(LogStyle::from_format("JSON"), None);
    }

    #[test]
    fn init_tracing_rejects_unknown_format() {
        let err = init_tracing("xml", "info").unwrap_err();
        assert!(err.to_string().contains("unknown log format 'xml'"));
    }
}
