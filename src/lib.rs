//! # Ostinato - OSC Command Protocol for Real-time Audio
//!
//! Client side of a real-time synthesis engine: build node graphs with
//! timestamped command bundles and run them live or render them to a
//! command file.
//!
//! ## Architecture
//!
//! Ostinato is an umbrella crate that coordinates:
//! - **ostinato-core** - Packet pool, identifier allocation, OSC wire protocol, request builder, live engine
//! - **ostinato-render** - Render engine writing command files for offline execution
//! - **ostinato-sampler** - WAV sound files, sound libraries, sampler plugin descriptors
//!
//! ## Quick Start
//!
//! ```ignore
//! use ostinato::prelude::*;
//!
//! let registry = PluginRegistry::new().with_library(&disk_sampler());
//! let (engine, mut processor) = LiveEngine::new(EngineOptions::default(), registry)?;
//!
//! let sounds = SoundLibrary::from_paths(&HoundSoundFileApi, ["kick.wav", "snare.wav"]);
//! let mut session = SessionBuilder::new().sounds(sounds).build(engine)?;
//!
//! let sound = session.next_sound();
//! session.start_voice(1, sound, 0.8)?;
//!
//! // audio callback
//! processor.process(frames, |dispatch| graph.execute(dispatch.frame_offset, dispatch.bytes));
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Live engine, sessions and rendering
//! - `render` - Command-file rendering

/// Re-export of ostinato-core for direct access
pub use ostinato_core as core;

pub use ostinato_core::{
    // Engine
    CommandProcessor,
    Dispatch,
    Engine,
    EngineOptions,
    LiveEngine,
    Request,
    SampleClock,

    // Protocol
    BusMappingFlags,
    Command,
    NodePlacement,
    Time,
    Timestamp,
    Value,

    // Identifiers
    AudioBusId,
    GroupId,
    NodeId,
    SynthId,
    ROOT_GROUP,

    // Plugins
    PluginLibrary,
    PluginRegistry,
    SynthDef,
};

// Sampler subsystem
pub use ostinato_sampler as sampler;

pub use ostinato_sampler::{disk_sampler, sampler, HoundSoundFileApi, Sound, SoundLibrary};

// Render
#[cfg(feature = "render")]
pub use ostinato_render as render;

#[cfg(feature = "render")]
pub use ostinato_render::{CommandFile, Record, RenderEngine, RenderSummary};

mod builder;
pub mod error;
mod session;

pub use builder::{SessionBuilder, SessionConfig, DEFAULT_LATENCY};
pub use error::{Error, Result};
pub use session::{Session, VoiceId};

/// Convenience prelude for common imports
pub mod prelude {
    // Session
    pub use crate::{Session, SessionBuilder, SessionConfig, VoiceId};

    // Engines
    pub use crate::{Engine, EngineOptions, LiveEngine, PluginRegistry};

    #[cfg(feature = "render")]
    pub use crate::RenderEngine;

    // Commands
    pub use crate::{AudioBusId, BusMappingFlags, NodePlacement, Timestamp, Value, ROOT_GROUP};

    // Sounds
    pub use crate::{disk_sampler, sampler, HoundSoundFileApi, SoundLibrary};
}
