use thiserror::Error;

use crate::engine::Strategy;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("{0} playback is not supported on this platform")]
    Unsupported(Strategy),

    #[error("Engine error: {0}")]
    Engine(String),

    /// Returned by host `MediaElement` implementations, e.g. a refused `play()`
    #[error("Media element error: {0}")]
    Element(String),

    #[error("Invalid relay base: {0}")]
    InvalidRelayBase(String),

    #[error("Playback controller has stopped")]
    ControllerStopped,
}

pub type Result<T> = std::result::Result<T, PlayerError>;
