//! Structured diagnostics
//!
//! The relay and the playback controller report what they do through an
//! injected [`Observer`] rather than logging directly. [`TracingObserver`]
//! forwards every event to `tracing`; tests plug in a recording observer.

use std::fmt;

use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Relay
    RelayRejected,
    RelayForward,
    RelayUpstreamError,
    RelayBodyError,

    // Playback
    SessionStarted,
    StrategySelected,
    EngineAttached,
    PlaybackStarted,
    EngineWarning,
    FatalError,
    RecoveryScheduled,
    RecoveryStarted,
    RecoveryAbandoned,
    TeardownStepFailed,
    SessionDestroyed,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RelayRejected => "relay_rejected",
            Self::RelayForward => "relay_forward",
            Self::RelayUpstreamError => "relay_upstream_error",
            Self::RelayBodyError => "relay_body_error",
            Self::SessionStarted => "session_started",
            Self::StrategySelected => "strategy_selected",
            Self::EngineAttached => "engine_attached",
            Self::PlaybackStarted => "playback_started",
            Self::EngineWarning => "engine_warning",
            Self::FatalError => "fatal_error",
            Self::RecoveryScheduled => "recovery_scheduled",
            Self::RecoveryStarted => "recovery_started",
            Self::RecoveryAbandoned => "recovery_abandoned",
            Self::TeardownStepFailed => "teardown_step_failed",
            Self::SessionDestroyed => "session_destroyed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DiagnosticEvent {
    pub level: Level,
    pub kind: EventKind,
    pub session_id: Option<String>,
    pub message: String,
}

impl DiagnosticEvent {
    pub fn new(level: Level, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            session_id: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Sink for diagnostics.
pub trait Observer: Send + Sync {
    fn record(&self, event: DiagnosticEvent);
}

/// Default observer: emits each event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn record(&self, event: DiagnosticEvent) {
        let session_id = event.session_id.as_deref().unwrap_or("-");
        let kind = event.kind.as_str();
        let message = event.message.as_str();
        match event.level {
            Level::ERROR => tracing::error!(kind, session_id, "{message}"),
            Level::WARN => tracing::warn!(kind, session_id, "{message}"),
            Level::INFO => tracing::info!(kind, session_id, "{message}"),
            Level::DEBUG => tracing::debug!(kind, session_id, "{message}"),
            _ => tracing::trace!(kind, session_id, "{message}"),
        }
    }
}

/// Short random identifier for a playback session.
#[must_use]
pub fn new_session_id() -> String {
    nanoid::nanoid!(12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_eq!(a.len(), 12);
        assert_ne!(a, b);
    }

    #[test]
    fn test_event_builder() {
        let event = DiagnosticEvent::new(Level::WARN, EventKind::FatalError, "boom")
            .with_session("abc");
        assert_eq!(event.session_id.as_deref(), Some("abc"));
        assert_eq!(event.kind.to_string(), "fatal_error");
    }

    #[test]
    fn test_tracing_observer_accepts_every_level() {
        let observer = TracingObserver;
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            observer.record(DiagnosticEvent::new(level, EventKind::RelayForward, "x"));
        }
    }
}
