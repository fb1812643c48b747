//! Host-provided playback capabilities
//!
//! The controller never decodes media itself. The platform supplies a media
//! element and, optionally, a software adaptive-manifest player and a
//! transport-stream demuxing player. Engines report asynchronous events back
//! through an [`EngineEventSink`].

use tokio::sync::mpsc;
use vidrelay_core::config::{AdaptiveTuning, DemuxTuning};

use crate::controller::ControllerMessage;
use crate::error::Result;

/// The video surface.
#[cfg_attr(test, mockall::automock)]
pub trait MediaElement: Send {
    /// Whether the element can play `mime` natively.
    fn can_play_type(&self, mime: &str) -> bool;
    fn set_src(&mut self, url: &str);
    /// Drop the current source.
    fn clear_src(&mut self);
    fn load(&mut self);
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn set_muted(&mut self, muted: bool);
    fn set_plays_inline(&mut self, inline: bool);
}

/// Events fired by the media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementEvent {
    LoadedMetadata,
    Ended,
    Stalled,
    Waiting,
    Error,
}

/// Error classes reported by the demuxing player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxErrorKind {
    Network,
    Media,
    Other,
}

/// Events emitted by a software engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The adaptive player parsed a playable manifest.
    ManifestParsed,
    AdaptiveError { fatal: bool, details: String },
    DemuxError { kind: DemuxErrorKind, detail: String },
}

/// Callback channel handed to an engine when it is created.
///
/// Events are tagged with the generation of the engine instance, so anything
/// an already destroyed instance emits late is discarded by the controller.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    generation: u64,
    tx: mpsc::WeakUnboundedSender<ControllerMessage>,
}

impl EngineEventSink {
    pub(crate) const fn new(
        generation: u64,
        tx: mpsc::WeakUnboundedSender<ControllerMessage>,
    ) -> Self {
        Self { generation, tx }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event. Returns `false` once the controller is gone.
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.tx.upgrade().is_some_and(|tx| {
            tx.send(ControllerMessage::Engine {
                generation: self.generation,
                event,
            })
            .is_ok()
        })
    }
}

/// Software player for adaptive (HLS) manifests.
pub trait AdaptiveBackend: Send + Sync {
    fn is_supported(&self) -> bool;
    fn create(
        &self,
        tuning: &AdaptiveTuning,
        events: EngineEventSink,
    ) -> Result<Box<dyn AdaptivePlayer>>;
}

pub trait AdaptivePlayer: Send {
    fn load_source(&mut self, url: &str) -> Result<()>;
    fn attach_media(&mut self, element: &mut dyn MediaElement) -> Result<()>;
    fn destroy(&mut self) -> Result<()>;
}

/// Descriptor handed to the demuxing player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDataSource {
    /// Container type, e.g. `mpegts`
    pub kind: String,
    pub is_live: bool,
    pub url: String,
    pub with_credentials: bool,
    pub has_audio: Option<bool>,
    pub has_video: Option<bool>,
}

impl MediaDataSource {
    /// Live MPEG-TS without credentials, the only shape the controller plays.
    #[must_use]
    pub fn live_mpegts(url: impl Into<String>) -> Self {
        Self {
            kind: "mpegts".to_string(),
            is_live: true,
            url: url.into(),
            with_credentials: false,
            has_audio: None,
            has_video: None,
        }
    }
}

/// Software player that demuxes raw transport streams.
pub trait DemuxBackend: Send + Sync {
    fn is_supported(&self) -> bool;
    fn create(
        &self,
        source: &MediaDataSource,
        tuning: &DemuxTuning,
        events: EngineEventSink,
    ) -> Result<Box<dyn DemuxPlayer>>;
}

pub trait DemuxPlayer: Send {
    fn attach_media_element(&mut self, element: &mut dyn MediaElement) -> Result<()>;
    fn load(&mut self) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn unload(&mut self) -> Result<()>;
    fn detach_media_element(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn destroy(&mut self) -> Result<()>;
}
