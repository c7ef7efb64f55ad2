//! Descriptors of the sampler plugins.
//!
//! Both sampler kinds take one control (`amp`) and two audio outputs, and are
//! constructed with `[path, loop]` options: the sound file to play and
//! whether playback loops. The disk sampler streams from disk; the sampler
//! loads the whole file into memory.

use ostinato_core::{
    ControlSpec, Error, PluginLibrary, Result, SynthDef, SynthFactory, UiNode, Value,
    PLUGINS_URI,
};

pub fn sampler_uri() -> String {
    format!("{}/sampler", PLUGINS_URI)
}

pub fn disk_sampler_uri() -> String {
    format!("{}/disksampler", PLUGINS_URI)
}

/// Factory shared by both sampler kinds.
pub struct SamplerFactory {
    def: SynthDef,
}

impl SamplerFactory {
    fn new(uri: String, streaming: bool) -> Self {
        let mut ui = UiNode::container("vbox", "Sampler");
        ui.push(UiNode::control(0, "knob", "Amp"));
        let def = SynthDef::new(uri)
            .control(ControlSpec::new(0, "amp").range(0.0, 1.0, 1.0))
            .ui(ui)
            .audio_outputs(2)
            .meta("streaming", streaming)
            .meta("channels", 2);
        Self { def }
    }
}

impl SynthFactory for SamplerFactory {
    fn definition(&self) -> &SynthDef {
        &self.def
    }

    fn validate_options(&self, options: &[Value]) -> Result<()> {
        match options {
            [Value::String(path), rest @ ..] if !path.is_empty() => match rest {
                [] | [Value::Int(_)] => Ok(()),
                [other] => Err(Error::InvalidCommand(format!(
                    "{}: loop flag must be an integer, got {}",
                    self.def.uri, other
                ))),
                _ => Err(Error::InvalidCommand(format!(
                    "{}: too many options",
                    self.def.uri
                ))),
            },
            _ => Err(Error::InvalidCommand(format!(
                "{}: first option must be a sound file path",
                self.def.uri
            ))),
        }
    }
}

/// In-memory sampler.
pub fn sampler() -> PluginLibrary {
    PluginLibrary::new("sampler").with_factory(SamplerFactory::new(sampler_uri(), false))
}

/// Streaming sampler.
pub fn disk_sampler() -> PluginLibrary {
    PluginLibrary::new("disksampler").with_factory(SamplerFactory::new(disk_sampler_uri(), true))
}
