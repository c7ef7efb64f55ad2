//! # Ostinato Sampler
//!
//! Sound playback support for Ostinato sessions:
//!
//! - [`HoundSoundFileApi`]: WAV backend for the core sound-file interface
//! - [`Sound`] / [`SoundLibrary`]: sound files addressed by index
//! - [`sampler`] / [`disk_sampler`]: plugin descriptors registered with an
//!   engine's [`PluginRegistry`](ostinato_core::PluginRegistry)

mod plugins;
mod sound;
mod wav;

pub use plugins::{disk_sampler, disk_sampler_uri, sampler, sampler_uri, SamplerFactory};
pub use sound::{Sound, SoundLibrary};
pub use wav::HoundSoundFileApi;
