//! Tracing subscriber setup
//!
//! Diagnostics from the relay and the playback controller reach `tracing`
//! through [`TracingObserver`](crate::TracingObserver) as events carrying
//! `kind` and `session_id` fields. In JSON output those fields sit at the top
//! level of each line so log pipelines can index them directly.

use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

/// Overrides `logging.level` with full `EnvFilter` directives.
pub const LOG_FILTER_ENV: &str = "VIDRELAY_LOG";

/// Install the global subscriber described by `config`.
///
/// Fails on an unknown level, an unopenable log file, or when a subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .with_env_var(LOG_FILTER_ENV)
        .from_env_lossy();

    let writer = make_writer(config.file_path.as_deref())?;
    let ansi = config.file_path.is_none();

    let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.format == "json" {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_ansi(ansi)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_file(false)
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;
    Ok(())
}

/// Stdout, or the configured file opened for append.
fn make_writer(file_path: Option<&str>) -> anyhow::Result<BoxMakeWriter> {
    let Some(path) = file_path else {
        return Ok(BoxMakeWriter::new(std::io::stdout));
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {path}: {e}"))?;
    Ok(BoxMakeWriter::new(Arc::new(file)))
}

fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiagnosticEvent, EventKind, Observer, TracingObserver};

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("INFO").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_init_rejects_bad_level() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("vidrelay.log");
        assert!(make_writer(path.to_str()).is_err());
    }

    // The only test in this crate that installs the global subscriber.
    #[test]
    fn test_json_lines_carry_observer_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vidrelay.log");
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            file_path: Some(path.to_string_lossy().into_owned()),
        };
        init_logging(&config).unwrap();

        TracingObserver.record(
            DiagnosticEvent::new(Level::INFO, EventKind::SessionStarted, "mounting stream")
                .with_session("abc123"),
        );
        TracingObserver.record(DiagnosticEvent::new(
            Level::DEBUG,
            EventKind::EngineWarning,
            "below the configured level",
        ));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains(r#""kind":"session_started""#), "{contents}");
        assert!(contents.contains(r#""session_id":"abc123""#), "{contents}");
        assert!(!contents.contains("below the configured level"));
    }
}
