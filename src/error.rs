//! Centralized error type for the ostinato umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

use crate::session::VoiceId;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ostinato_core::Error),

    /// A sound could not be added to the session.
    #[error("Sound file: {0}")]
    SoundFile(#[from] ostinato_core::SoundFileError),

    /// A voice was addressed that has no live node.
    #[error("Unknown voice: {0}")]
    UnknownVoice(VoiceId),

    #[error("Invalid session config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
