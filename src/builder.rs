//! Configuration and builder for a [`Session`].

use ostinato_core::{AudioBusId, BusMappingFlags, Engine};
use ostinato_sampler::{disk_sampler_uri, SoundLibrary};
use serde::{Deserialize, Serialize};

use crate::session::Session;
use crate::{Error, Result};

/// Pre-roll between constructing a voice and letting it sound, in seconds.
pub const DEFAULT_LATENCY: f64 = 0.1;

/// How a session builds and schedules its voices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay from "now" for activations and frees. Zero schedules everything
    /// on arrival.
    pub latency: f64,
    /// Synth definition used for voices.
    pub synth_uri: String,
    /// Buses receiving the voice synth's two outputs.
    pub output_buses: [AudioBusId; 2],
    pub output_flags: BusMappingFlags,
    /// Passed to the synth as its playback-mode option.
    pub loop_playback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            synth_uri: disk_sampler_uri(),
            output_buses: [AudioBusId(1), AudioBusId(2)],
            output_flags: BusMappingFlags::INTERNAL,
            loop_playback: true,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.latency.is_finite() || self.latency < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "latency must be a non-negative number of seconds, got {}",
                self.latency
            )));
        }
        Ok(())
    }
}

/// # Example
///
/// ```ignore
/// use ostinato::prelude::*;
///
/// let session = SessionBuilder::new()
///     .sounds(SoundLibrary::from_paths(&HoundSoundFileApi, paths))
///     .latency(0.05)
///     .build(engine)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    sounds: SoundLibrary,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sounds(mut self, sounds: SoundLibrary) -> Self {
        self.sounds = sounds;
        self
    }

    /// Default: [`DEFAULT_LATENCY`]
    pub fn latency(mut self, seconds: f64) -> Self {
        self.config.latency = seconds;
        self
    }

    /// Default: the disk sampler.
    pub fn synth(mut self, uri: impl Into<String>) -> Self {
        self.config.synth_uri = uri.into();
        self
    }

    /// Default: buses 1 and 2, internal.
    pub fn outputs(mut self, left: AudioBusId, right: AudioBusId, flags: BusMappingFlags) -> Self {
        self.config.output_buses = [left, right];
        self.config.output_flags = flags;
        self
    }

    /// Default: true
    pub fn looping(mut self, enabled: bool) -> Self {
        self.config.loop_playback = enabled;
        self
    }

    pub fn build<E: Engine>(self, engine: E) -> Result<Session<E>> {
        Session::new(engine, self.sounds, self.config)
    }
}
