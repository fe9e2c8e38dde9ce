//! Diagnostic logging to stderr (or a file).
//!
//! Command line flags win over environment variables, which win over the
//! defaults (`error` level, human format, stderr).
//!
//! | Variable            | Meaning                                  |
//! |---------------------|------------------------------------------|
//! | `AIGATE_LOG`        | level: trace, debug, info, warn, error   |
//! | `AIGATE_LOG_FORMAT` | human, json, compact                     |
//! | `AIGATE_LOG_FILE`   | append logs to this file instead         |
//!
//! `RUST_LOG`, when set, replaces the computed filter entirely.

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub const LOG_LEVEL_ENV: &str = "AIGATE_LOG";
pub const LOG_FORMAT_ENV: &str = "AIGATE_LOG_FORMAT";
pub const LOG_FILE_ENV: &str = "AIGATE_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable logs.
    #[default]
    Human,
    /// JSON logs (one event per line).
    Json,
    /// Compact logs (single line, terse).
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" | "pretty" => Some(Self::Human),
            "json" | "jsonl" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    #[default]
    Error,
}

impl LogLevel {
    /// Parse from CLI argument or env value.
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "verbose" | "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "critical" | "crit" => Some(Self::Error),
            _ => None,
        }
    }

    /// Filter directive spelling.
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Convert to tracing level.
    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// Combine CLI flags with the environment.
    ///
    /// `verbose` raises the default level to `debug` but never overrides an
    /// explicit level.
    #[must_use]
    pub fn resolve(level: Option<LogLevel>, format: Option<LogFormat>, verbose: bool) -> Self {
        Self::resolve_with(level, format, verbose, |key| std::env::var(key).ok())
    }

    /// [`resolve`](Self::resolve) with an injectable environment lookup.
    pub fn resolve_with(
        level: Option<LogLevel>,
        format: Option<LogFormat>,
        verbose: bool,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env_value = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let level = level
            .or_else(|| env_value(LOG_LEVEL_ENV).and_then(|v| LogLevel::from_arg(&v)))
            .unwrap_or(if verbose { LogLevel::Debug } else { LogLevel::Error });
        let format = format
            .or_else(|| env_value(LOG_FORMAT_ENV).and_then(|v| LogFormat::from_arg(&v)))
            .unwrap_or_default();
        let file = env_value(LOG_FILE_ENV).map(PathBuf::from);

        Self {
            level,
            format,
            file,
        }
    }

    /// Default filter directive (`aigate=<level>`).
    #[must_use]
    pub fn filter_directive(&self) -> String {
        format!("{}={}", env!("CARGO_CRATE_NAME"), self.level.as_filter())
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(settings: &LogSettings) {
    let writer = settings
        .file
        .as_ref()
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        })
        .map_or_else(|| BoxMakeWriter::new(std::io::stderr), BoxMakeWriter::new);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.filter_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    let installed = match settings.format {
        LogFormat::Json => builder
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .try_init(),
        LogFormat::Compact => builder.compact().with_target(true).try_init(),
        LogFormat::Human => builder.with_target(false).without_time().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn defaults_without_flags_or_env() {
        let settings = LogSettings::resolve_with(None, None, false, env(&[]));
        assert_eq!(settings, LogSettings::default());
        assert_eq!(settings.filter_directive(), "aigate=error");
    }

    #[test]
    fn env_fills_in_missing_flags() {
        let settings = LogSettings::resolve_with(
            None,
            None,
            false,
            env(&[
                (LOG_LEVEL_ENV, " warn "),
                (LOG_FORMAT_ENV, "json"),
                (LOG_FILE_ENV, "/tmp/aigate.log"),
            ]),
        );
        assert_eq!(settings.level, LogLevel::Warn);
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.file, Some(PathBuf::from("/tmp/aigate.log")));
    }

    #[test]
    fn flags_win_over_env() {
        let settings = LogSettings::resolve_with(
            Some(LogLevel::Trace),
            Some(LogFormat::Compact),
            false,
            env(&[(LOG_LEVEL_ENV, "warn"), (LOG_FORMAT_ENV, "json")]),
        );
        assert_eq!(settings.level, LogLevel::Trace);
        assert_eq!(settings.format, LogFormat::Compact);
    }

    #[test]
    fn verbose_only_raises_the_default() {
        let verbose = LogSettings::resolve_with(None, None, true, env(&[]));
        assert_eq!(verbose.level, LogLevel::Debug);
        let explicit = LogSettings::resolve_with(None, None, true, env(&[(LOG_LEVEL_ENV, "info")]));
        assert_eq!(explicit.level, LogLevel::Info);
    }

    #[test]
    fn unknown_values_are_ignored() {
        let settings = LogSettings::resolve_with(
            None,
            None,
            false,
            env(&[(LOG_LEVEL_ENV, "loud"), (LOG_FORMAT_ENV, "xml")]),
        );
        assert_eq!(settings.level, LogLevel::Error);
        assert_eq!(settings.format, LogFormat::Human);
    }
}
