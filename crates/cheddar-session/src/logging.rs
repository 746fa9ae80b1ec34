//! Process-wide tracing subscriber setup.

use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a log level string (case-insensitive, defaults to Info).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().trim() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    /// Directive understood by `EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_directive().to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Console,
    Json,
}

impl LogFormat {
    /// Parse a format string (defaults to Console).
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().trim() {
            "json" => Self::Json,
            _ => Self::Console,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Returns false when a subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let level = LogLevel::parse(&config.level).as_directive();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match LogFormat::parse(&config.format) {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Console => builder.with_target(false).try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(LogLevel::parse("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::parse(" warning "), LogLevel::Warn);
        assert_eq!(LogLevel::parse("bogus"), LogLevel::Info);
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
    }

    #[test]
    fn parses_formats() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Console);
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        let cfg = LoggingConfig {
            level: "warn".to_string(),
            format: "console".to_string(),
        };
        let _ = init_logging(&cfg);
        assert!(!init_logging(&cfg));
    }
}
