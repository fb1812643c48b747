//! Playback controller
//!
//! Picks a playback engine for a stream URL (adaptive-manifest player,
//! transport-stream demuxer, or the media element itself), attaches it to a
//! video surface and keeps it alive: fatal errors, stalls and end-of-stream
//! tear the engine down and re-attach it after a backoff.
//!
//! The engines and the media element are host capabilities described by the
//! traits in [`capability`]; this crate only drives them.

pub mod capability;
pub mod controller;
pub mod engine;
pub mod error;
pub mod session;

pub use capability::{
    AdaptiveBackend, AdaptivePlayer, DemuxBackend, DemuxErrorKind, DemuxPlayer, ElementEvent,
    EngineEvent, EngineEventSink, MediaDataSource, MediaElement,
};
pub use controller::{ControllerHandle, PlaybackController};
pub use engine::{Backends, PlaybackEngine, Strategy};
pub use error::PlayerError;
pub use session::{RecoveryTrigger, SessionSnapshot, SessionState};
