//! Command protocol core for a real-time audio engine.
//!
//! # Primary API
//!
//! - [`Engine`]: capability interface shared by the live and render engines
//! - [`LiveEngine`] / [`CommandProcessor`]: control side and audio side of a live engine
//! - [`Request`]: builds timestamped command bundles with local id allocation
//! - [`PacketPool`]: fixed pool of wire buffers, released exactly once
//! - [`NodeIdAllocator`] / [`IdAllocator`]: lowest-free identifier allocation
//! - [`PluginRegistry`]: URI-addressed synth definitions used for validation
//!
//! # Example
//!
//! ```ignore
//! use ostinato_core::prelude::*;
//!
//! let (mut engine, mut processor) = LiveEngine::new(EngineOptions::default(), registry)?;
//!
//! let mut req = engine.request();
//! let group = req.group(NodePlacement::tail(ROOT_GROUP))?;
//! req.send()?;
//!
//! // audio callback
//! processor.process(frames, |dispatch| graph.execute(dispatch.frame_offset, dispatch.bytes));
//! ```

pub mod command;
pub mod engine;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod node_ids;
pub mod options;
pub mod packet;
pub mod plugin;
pub mod protocol;
pub mod request;
pub mod soundfile;
pub mod value;

pub use command::{AddAction, BusMappingFlags, Command, NodePlacement};
pub use engine::{CommandProcessor, Dispatch, Engine, LiveEngine, SampleClock};
pub use error::{Error, Result};
pub use ids::{AudioBusId, GroupId, IdAllocator, NodeId, ResourceId, SynthId, ROOT_GROUP};
pub use metadata::{Assoc, ControlSpec, MetaData, UiNode};
pub use node_ids::{NodeIdAllocator, NodeKind};
pub use options::EngineOptions;
pub use packet::{Packet, PacketPool, DEFAULT_PACKET_COUNT, DEFAULT_PACKET_SIZE};
pub use plugin::{
    patch_cable, DefinitionFactory, PluginLibrary, PluginRegistry, SynthDef, SynthFactory,
    PLUGINS_URI,
};
pub use protocol::{Bundle, Element, Message, Time, Timestamp};
pub use request::Request;
pub use soundfile::{FileMode, SoundFile, SoundFileApi, SoundFileError, SoundFileInfo};
pub use value::Value;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::{
        AudioBusId, BusMappingFlags, Engine, EngineOptions, Error, GroupId, LiveEngine,
        NodeId, NodePlacement, PluginRegistry, Request, Result, SynthId, Timestamp, Value,
        ROOT_GROUP,
    };
}
