//! Playback strategies
//!
//! Each strategy wraps one host capability behind [`PlaybackEngine`], so the
//! controller's state machine never branches on which engine is running.

mod adaptive;
mod demux;
mod native;

use std::fmt;
use std::sync::Arc;

use vidrelay_core::{config::PlaybackConfig, source::MANIFEST_MIME, StreamKind};

use crate::capability::{
    AdaptiveBackend, DemuxBackend, ElementEvent, EngineEvent, EngineEventSink, MediaElement,
};
use crate::error::{PlayerError, Result};
use crate::session::RecoveryTrigger;

pub use adaptive::AdaptiveEngine;
pub use demux::DemuxEngine;
pub use native::NativeEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Software adaptive-manifest player
    Adaptive,
    /// Software transport-stream demuxer
    Demux,
    /// URL assigned straight to the media element
    Native,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::Demux => "demux",
            Self::Native => "native",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional software engines available on this platform.
#[derive(Clone, Default)]
pub struct Backends {
    pub adaptive: Option<Arc<dyn AdaptiveBackend>>,
    pub demux: Option<Arc<dyn DemuxBackend>>,
}

impl Backends {
    fn adaptive_supported(&self) -> bool {
        self.adaptive.as_ref().is_some_and(|b| b.is_supported())
    }

    fn demux_supported(&self) -> bool {
        self.demux.as_ref().is_some_and(|b| b.is_supported())
    }
}

/// Pick a strategy for a stream, first match wins:
/// 1. manifest + software adaptive player
/// 2. manifest + element plays manifests natively
/// 3. transport stream + software demuxer
/// 4. the element itself
#[must_use]
pub fn select_strategy(kind: StreamKind, backends: &Backends, element: &dyn MediaElement) -> Strategy {
    match kind {
        StreamKind::AdaptiveManifest if backends.adaptive_supported() => Strategy::Adaptive,
        StreamKind::AdaptiveManifest if element.can_play_type(MANIFEST_MIME) => Strategy::Native,
        StreamKind::TransportStream if backends.demux_supported() => Strategy::Demux,
        _ => Strategy::Native,
    }
}

/// How the controller should react to an engine or element event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Ignore,
    /// Worth a debug line, nothing else
    Note(String),
    /// Non-fatal problem; the engine keeps running
    Warning(String),
    /// The stream is playable
    Ready,
    Fatal {
        trigger: RecoveryTrigger,
        reason: String,
    },
}

impl Disposition {
    pub(crate) fn fatal(trigger: RecoveryTrigger, reason: impl Into<String>) -> Self {
        Self::Fatal {
            trigger,
            reason: reason.into(),
        }
    }
}

/// Reports a failed teardown step without interrupting the remaining steps.
pub type TeardownReport<'a> = dyn FnMut(&'static str, PlayerError) + 'a;

/// Common interface of an attached engine instance.
pub trait PlaybackEngine: Send {
    fn strategy(&self) -> Strategy;

    /// Element events this engine subscribes to while attached.
    fn listeners(&self) -> &'static [ElementEvent];

    /// Begin playback once [`Disposition::Ready`] was returned.
    fn start(&mut self, element: &mut dyn MediaElement) -> Result<()>;

    fn on_engine_event(&mut self, event: EngineEvent) -> Disposition;

    fn on_element_event(&mut self, event: ElementEvent) -> Disposition;

    /// Stop and release the instance. Every step runs even if an earlier one fails.
    fn destroy(self: Box<Self>, element: &mut dyn MediaElement, report: &mut TeardownReport<'_>);
}

/// Inputs for constructing an engine instance.
pub struct AttachRequest<'a> {
    pub url: &'a str,
    pub element: &'a mut dyn MediaElement,
    pub events: EngineEventSink,
    pub config: &'a PlaybackConfig,
    /// Receives teardown failures of an instance discarded by a failed attach
    pub teardown: &'a mut TeardownReport<'a>,
}

/// A freshly attached engine.
pub struct Attached {
    pub engine: Box<dyn PlaybackEngine>,
    /// Already playing; no readiness signal to wait for
    pub playing: bool,
    pub warnings: Vec<String>,
}

/// Construct and attach an engine for `strategy`.
///
/// Autoplay needs a muted, inline element, so that is set up first whatever
/// the strategy.
pub fn attach(strategy: Strategy, backends: &Backends, request: AttachRequest<'_>) -> Result<Attached> {
    request.element.set_muted(true);
    request.element.set_plays_inline(true);

    match strategy {
        Strategy::Adaptive => {
            let backend = backends
                .adaptive
                .as_deref()
                .ok_or(PlayerError::Unsupported(Strategy::Adaptive))?;
            AdaptiveEngine::attach(backend, request)
        }
        Strategy::Demux => {
            let backend = backends
                .demux
                .as_deref()
                .ok_or(PlayerError::Unsupported(Strategy::Demux))?;
            DemuxEngine::attach(backend, request)
        }
        Strategy::Native => Ok(NativeEngine::attach(request)),
    }
}

/// Element handling shared by the software engines: end of stream and
/// stalls restart the engine, everything else is left to the engine.
fn software_element_disposition(strategy: Strategy, event: ElementEvent) -> Disposition {
    match event {
        ElementEvent::Ended => {
            Disposition::fatal(RecoveryTrigger::Ended, format!("{strategy} stream ended"))
        }
        ElementEvent::Stalled => {
            Disposition::fatal(RecoveryTrigger::Stalled, format!("{strategy} stream stalled"))
        }
        ElementEvent::Waiting => Disposition::Note("element waiting for data".to_string()),
        ElementEvent::LoadedMetadata | ElementEvent::Error => Disposition::Ignore,
    }
}
