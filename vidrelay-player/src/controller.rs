//! Session supervisor
//!
//! A [`PlaybackController`] is a single task that owns the media element, the
//! current [`PlaybackSession`] and its engine. Commands, element events and
//! engine callbacks all arrive on one channel and are handled one at a time,
//! so no state is shared and nothing is locked. The only other wake-up source
//! is the pending recovery deadline.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::Level;
use url::Url;
use vidrelay_core::{
    config::PlaybackConfig, observability::new_session_id, relay_url, DiagnosticEvent, EventKind,
    Observer, StreamSource,
};

use crate::capability::{ElementEvent, EngineEvent, EngineEventSink, MediaElement};
use crate::engine::{
    self, select_strategy, AttachRequest, Attached, Backends, Disposition, Strategy,
};
use crate::error::{PlayerError, Result};
use crate::session::{
    PendingRecovery, PlaybackSession, RecoveryTrigger, SessionSnapshot, SessionState,
};

#[derive(Debug)]
pub(crate) enum ControllerMessage {
    Command(Command),
    Element(ElementEvent),
    Engine { generation: u64, event: EngineEvent },
}

#[derive(Debug)]
pub(crate) enum Command {
    Load(StreamSource),
    Reload,
    Unmount,
}

/// Cheap handle for driving a running controller.
///
/// The controller stops once every handle is dropped.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControllerMessage>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl ControllerHandle {
    /// Mount `source`, replacing whatever session is current.
    pub fn load(&self, source: StreamSource) -> Result<()> {
        self.send(ControllerMessage::Command(Command::Load(source)))
    }

    /// Start a fresh session for the current source.
    pub fn reload(&self) -> Result<()> {
        self.send(ControllerMessage::Command(Command::Reload))
    }

    pub fn unmount(&self) -> Result<()> {
        self.send(ControllerMessage::Command(Command::Unmount))
    }

    /// Forward an event fired by the media element.
    pub fn element_event(&self, event: ElementEvent) -> Result<()> {
        self.send(ControllerMessage::Element(event))
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    fn send(&self, message: ControllerMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| PlayerError::ControllerStopped)
    }
}

pub struct PlaybackController {
    config: PlaybackConfig,
    relay_base: Option<Url>,
    backends: Backends,
    element: Box<dyn MediaElement>,
    observer: Arc<dyn Observer>,
    rx: mpsc::UnboundedReceiver<ControllerMessage>,
    /// Handed to engines; must not keep the channel open on its own
    weak_tx: mpsc::WeakUnboundedSender<ControllerMessage>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    session: Option<PlaybackSession>,
    /// Engine generations are unique for the lifetime of the controller
    next_generation: u64,
}

impl PlaybackController {
    /// Build a controller around `element`.
    ///
    /// Fails if `config.relay_base` is set but not a valid URL.
    pub fn new(
        config: &PlaybackConfig,
        backends: Backends,
        element: Box<dyn MediaElement>,
        observer: Arc<dyn Observer>,
    ) -> Result<(Self, ControllerHandle)> {
        let relay_base = config
            .relay_base
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| PlayerError::InvalidRelayBase(format!("{raw}: {e}")))
            })
            .transpose()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let controller = Self {
            config: config.clone(),
            relay_base,
            backends,
            element,
            observer,
            rx,
            weak_tx: tx.downgrade(),
            snapshot_tx,
            session: None,
            next_generation: 0,
        };
        let handle = ControllerHandle {
            tx,
            snapshot: snapshot_rx,
        };
        Ok((controller, handle))
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process messages until every [`ControllerHandle`] is gone, then tear
    /// the current session down.
    pub async fn run(mut self) {
        loop {
            let deadline = self
                .session
                .as_ref()
                .and_then(PlaybackSession::recovery_deadline);

            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_recovery_due();
                }
            }
            self.publish();
        }

        self.destroy_session();
        self.publish();
    }

    fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::Command(Command::Load(source)) => self.mount(source),
            ControllerMessage::Command(Command::Reload) => {
                if let Some(source) = self.session.as_ref().map(|s| s.source.clone()) {
                    self.mount(source);
                }
            }
            ControllerMessage::Command(Command::Unmount) => self.destroy_session(),
            ControllerMessage::Element(event) => self.on_element_event(event),
            ControllerMessage::Engine { generation, event } => {
                self.on_engine_event(generation, event);
            }
        }
    }

    fn mount(&mut self, source: StreamSource) {
        self.destroy_session();

        let playable = match &self.relay_base {
            Some(base) => relay_url(base, source.url()),
            None => source.url().clone(),
        };
        let session = PlaybackSession::new(new_session_id(), source, playable);
        record(
            &*self.observer,
            &session,
            Level::INFO,
            EventKind::SessionStarted,
            format!("mounting {}", session.source),
        );
        self.session = Some(session);
        self.attach();
    }

    fn attach(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.destroyed {
            return;
        }

        let strategy = select_strategy(session.source.kind(), &self.backends, &*self.element);
        record(
            &*self.observer,
            session,
            Level::INFO,
            EventKind::StrategySelected,
            format!("{strategy} playback for {}", session.source),
        );

        self.next_generation += 1;
        let generation = self.next_generation;
        session.state = SessionState::Attaching;

        let observer = &*self.observer;
        let session_id = session.id.as_str();
        let mut teardown = |step: &'static str, error: PlayerError| {
            report_teardown_failure(observer, session_id, strategy, step, &error);
        };
        let request = AttachRequest {
            url: session.playable.as_str(),
            element: &mut *self.element,
            events: EngineEventSink::new(generation, self.weak_tx.clone()),
            config: &self.config,
            teardown: &mut teardown,
        };
        let failure = match engine::attach(strategy, &self.backends, request) {
            Ok(Attached {
                engine,
                playing,
                warnings,
            }) => {
                for warning in warnings {
                    record(&*self.observer, session, Level::WARN, EventKind::EngineWarning, warning);
                }
                session.generation = generation;
                session.listeners = engine.listeners();
                session.engine = Some(engine);
                record(
                    &*self.observer,
                    session,
                    Level::INFO,
                    EventKind::EngineAttached,
                    format!("{strategy} engine attached (generation {generation})"),
                );
                if playing {
                    session.state = SessionState::Playing;
                    record(
                        &*self.observer,
                        session,
                        Level::INFO,
                        EventKind::PlaybackStarted,
                        format!("{strategy} playback started"),
                    );
                }
                None
            }
            Err(e) => Some(e),
        };

        if let Some(e) = failure {
            self.apply(Disposition::fatal(
                RecoveryTrigger::EngineError,
                format!("{strategy} attach failed: {e}"),
            ));
        }
    }

    fn on_element_event(&mut self, event: ElementEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.listens_to(event) {
            return;
        }
        let Some(engine) = session.engine.as_mut() else {
            return;
        };
        let disposition = engine.on_element_event(event);
        self.apply(disposition);
    }

    fn on_engine_event(&mut self, generation: u64, event: EngineEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let engine = match session.engine.as_mut() {
            Some(engine) if session.generation == generation => engine,
            _ => {
                tracing::trace!(generation, ?event, "dropping event from a stale engine");
                return;
            }
        };
        let disposition = engine.on_engine_event(event);
        self.apply(disposition);
    }

    fn apply(&mut self, disposition: Disposition) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match disposition {
            Disposition::Ignore => {}
            Disposition::Note(note) => {
                record(&*self.observer, session, Level::DEBUG, EventKind::EngineWarning, note);
            }
            Disposition::Warning(warning) => {
                record(&*self.observer, session, Level::WARN, EventKind::EngineWarning, warning);
            }
            Disposition::Ready => self.on_ready(),
            Disposition::Fatal { trigger, reason } => {
                record(&*self.observer, session, Level::ERROR, EventKind::FatalError, reason);
                self.begin_recovery(trigger);
            }
        }
    }

    fn on_ready(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(engine) = session.engine.as_mut() else {
            return;
        };
        session.consecutive_failures = 0;
        if session.state == SessionState::Playing {
            return;
        }

        let strategy = engine.strategy();
        match engine.start(&mut *self.element) {
            Ok(()) => {
                session.state = SessionState::Playing;
                record(
                    &*self.observer,
                    session,
                    Level::INFO,
                    EventKind::PlaybackStarted,
                    format!("{strategy} playback started"),
                );
            }
            Err(e) => record(
                &*self.observer,
                session,
                Level::WARN,
                EventKind::EngineWarning,
                format!("play() rejected: {e}"),
            ),
        }
    }

    fn begin_recovery(&mut self, trigger: RecoveryTrigger) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.destroyed || session.pending_recovery.is_some() {
            return;
        }

        session.consecutive_failures = session.consecutive_failures.saturating_add(1);
        let attempt = session.consecutive_failures;
        teardown_engine(session, &mut *self.element, &*self.observer);

        let recovery = &self.config.recovery;
        if recovery.max_attempts.is_some_and(|max| attempt > max) {
            session.state = SessionState::Idle;
            record(
                &*self.observer,
                session,
                Level::ERROR,
                EventKind::RecoveryAbandoned,
                format!("giving up after {} failed recoveries", attempt - 1),
            );
            return;
        }

        let delay = trigger.backoff(recovery, attempt);
        session.pending_recovery = Some(PendingRecovery {
            deadline: Instant::now() + delay,
            trigger,
        });
        session.state = SessionState::Recovering;
        record(
            &*self.observer,
            session,
            Level::WARN,
            EventKind::RecoveryScheduled,
            format!("{trigger:?} recovery attempt {attempt} in {delay:?}"),
        );
    }

    fn on_recovery_due(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(pending) = session.pending_recovery.take() else {
            return;
        };
        if session.destroyed {
            return;
        }

        session.reload_count += 1;
        record(
            &*self.observer,
            session,
            Level::INFO,
            EventKind::RecoveryStarted,
            format!(
                "reload #{} after {:?}",
                session.reload_count, pending.trigger
            ),
        );
        self.attach();
    }

    fn destroy_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.destroyed = true;
        session.pending_recovery = None;
        teardown_engine(&mut session, &mut *self.element, &*self.observer);
        session.state = SessionState::Idle;
        record(
            &*self.observer,
            &session,
            Level::INFO,
            EventKind::SessionDestroyed,
            format!("session for {} destroyed", session.source),
        );
    }

    fn publish(&self) {
        let snapshot = self
            .session
            .as_ref()
            .map_or_else(SessionSnapshot::default, PlaybackSession::snapshot);
        self.snapshot_tx.send_replace(snapshot);
    }
}

/// Detach element listeners and destroy the engine, if any.
fn teardown_engine(
    session: &mut PlaybackSession,
    element: &mut dyn MediaElement,
    observer: &dyn Observer,
) {
    session.listeners = &[];
    let Some(engine) = session.engine.take() else {
        return;
    };

    let strategy = engine.strategy();
    let session_id = session.id.as_str();
    engine.destroy(element, &mut |step, error| {
        report_teardown_failure(observer, session_id, strategy, step, &error);
    });
}

fn report_teardown_failure(
    observer: &dyn Observer,
    session_id: &str,
    strategy: Strategy,
    step: &'static str,
    error: &PlayerError,
) {
    observer.record(
        DiagnosticEvent::new(
            Level::WARN,
            EventKind::TeardownStepFailed,
            format!("{strategy} teardown step '{step}' failed: {error}"),
        )
        .with_session(session_id),
    );
}

fn record(
    observer: &dyn Observer,
    session: &PlaybackSession,
    level: Level,
    kind: EventKind,
    message: impl Into<String>,
) {
    observer.record(DiagnosticEvent::new(level, kind, message).with_session(session.id.as_str()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MockMediaElement;
    use vidrelay_core::TracingObserver;

    #[test]
    fn test_invalid_relay_base_is_rejected() {
        let config = PlaybackConfig {
            relay_base: Some("not a url".to_string()),
            ..PlaybackConfig::default()
        };
        let result = PlaybackController::new(
            &config,
            Backends::default(),
            Box::new(MockMediaElement::new()),
            Arc::new(TracingObserver),
        );
        assert!(matches!(result, Err(PlayerError::InvalidRelayBase(_))));
    }

    #[tokio::test]
    async fn test_handle_fails_once_controller_is_gone() {
        let (controller, handle) = PlaybackController::new(
            &PlaybackConfig::default(),
            Backends::default(),
            Box::new(MockMediaElement::new()),
            Arc::new(TracingObserver),
        )
        .unwrap();
        drop(controller);

        assert_eq!(handle.unmount(), Err(PlayerError::ControllerStopped));
        assert_eq!(handle.snapshot(), SessionSnapshot::default());
    }
}
