//! Per-mount playback session record

use std::time::Duration;

use tokio::time::Instant;
use url::Url;
use vidrelay_core::{config::RecoveryConfig, StreamSource};

use crate::capability::ElementEvent;
use crate::engine::{PlaybackEngine, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Attaching,
    Playing,
    Recovering,
}

/// What sent the session into recovery. Each trigger has its own backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTrigger {
    /// Fatal error reported by a software engine, or a failed attach
    EngineError,
    Ended,
    Stalled,
    ElementError,
}

impl RecoveryTrigger {
    #[must_use]
    pub const fn base_backoff(self, config: &RecoveryConfig) -> Duration {
        let ms = match self {
            Self::EngineError => config.engine_error_backoff_ms,
            Self::Ended => config.ended_backoff_ms,
            Self::Stalled => config.stalled_backoff_ms,
            Self::ElementError => config.element_error_backoff_ms,
        };
        Duration::from_millis(ms)
    }

    /// Backoff before the `attempt`-th consecutive recovery (1-based).
    #[must_use]
    pub fn backoff(self, config: &RecoveryConfig, attempt: u32) -> Duration {
        let base = self.base_backoff(config);
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = base.mul_f64(config.backoff_factor.max(1.0).powi(exponent).min(1e6));
        scaled.min(Duration::from_millis(config.max_backoff_ms).max(base))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingRecovery {
    pub deadline: Instant,
    pub trigger: RecoveryTrigger,
}

/// Observable view of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub state: SessionState,
    pub strategy: Option<Strategy>,
    pub reload_count: u64,
    pub consecutive_failures: u32,
}

/// Everything the controller knows about one mounted source.
///
/// Only the controller mutates it, one message at a time.
pub(crate) struct PlaybackSession {
    pub id: String,
    pub source: StreamSource,
    /// URL handed to engines: the source, wrapped by the relay when one is configured
    pub playable: Url,
    pub state: SessionState,
    pub engine: Option<Box<dyn PlaybackEngine>>,
    /// Generation of `engine`; events tagged with any other value are stale
    pub generation: u64,
    /// Element events the attached engine listens to
    pub listeners: &'static [ElementEvent],
    pub reload_count: u64,
    pub consecutive_failures: u32,
    pub pending_recovery: Option<PendingRecovery>,
    pub destroyed: bool,
}

impl PlaybackSession {
    pub fn new(id: String, source: StreamSource, playable: Url) -> Self {
        Self {
            id,
            source,
            playable,
            state: SessionState::Idle,
            engine: None,
            generation: 0,
            listeners: &[],
            reload_count: 0,
            consecutive_failures: 0,
            pending_recovery: None,
            destroyed: false,
        }
    }

    pub fn recovery_deadline(&self) -> Option<Instant> {
        if self.destroyed {
            return None;
        }
        self.pending_recovery.map(|p| p.deadline)
    }

    pub fn listens_to(&self, event: ElementEvent) -> bool {
        self.listeners.contains(&event)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: Some(self.id.clone()),
            state: self.state,
            strategy: self.engine.as_ref().map(|e| e.strategy()),
            reload_count: self.reload_count,
            consecutive_failures: self.consecutive_failures,
        }
    }
}
