//! Node-graph session: sound voices mapped onto engine synths.
//!
//! Every voice is one sampler synth inside the session's voice group. A voice
//! is built in two steps carried by one packet: a construction bundle that
//! creates the synth and maps its outputs, executed on arrival, and an
//! activation bundle scheduled `latency` seconds after the engine's current
//! time. Frees use the same margin so in-flight audio is not cut short.

use std::collections::HashMap;
use std::path::Path;

use ostinato_core::{
    Engine, GroupId, NodePlacement, SoundFileApi, SynthId, Timestamp, Value, ROOT_GROUP,
};
use ostinato_sampler::{Sound, SoundLibrary};

use crate::builder::SessionConfig;
use crate::{Error, Result};

/// Caller-chosen voice handle, e.g. a touch or note identifier.
pub type VoiceId = u64;

pub struct Session<E: Engine> {
    engine: E,
    sounds: SoundLibrary,
    config: SessionConfig,
    voice_group: GroupId,
    voices: HashMap<VoiceId, SynthId>,
    next_sound: usize,
}

impl<E: Engine> Session<E> {
    /// Create the voice group under the root group.
    pub fn new(mut engine: E, sounds: SoundLibrary, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        engine.plugins().get(&config.synth_uri)?;

        let voice_group = {
            let mut req = engine.request();
            let group = req.group(NodePlacement::tail(ROOT_GROUP))?;
            req.send()?;
            group
        };
        tracing::debug!(group = %voice_group, sounds = sounds.len(), "session created");

        Ok(Self {
            engine,
            sounds,
            config,
            voice_group,
            voices: HashMap::new(),
            next_sound: 0,
        })
    }

    /// Start `voice` playing sound `sound_index` at `amplitude`.
    ///
    /// A voice that is already playing is stopped first. An out-of-range
    /// sound index starts nothing and returns `Ok(None)`.
    pub fn start_voice(
        &mut self,
        voice: VoiceId,
        sound_index: usize,
        amplitude: f32,
    ) -> Result<Option<SynthId>> {
        if self.voices.contains_key(&voice) {
            self.stop_voice(voice)?;
        }

        let Some(sound) = self.sounds.get(sound_index) else {
            tracing::warn!(voice, sound_index, sounds = self.sounds.len(), "no such sound");
            return Ok(None);
        };

        let now = self.engine.current_time();
        let options = [
            Value::from(sound.path_str()),
            Value::from(self.config.loop_playback),
        ];
        let [left, right] = self.config.output_buses;
        let flags = self.config.output_flags;

        let mut req = self.engine.request();
        req.open_bundle(Timestamp::Immediate);
        let synth = req.synth(
            &self.config.synth_uri,
            NodePlacement::tail(self.voice_group),
            &[amplitude],
            &options,
        )?;
        req.map_output(synth, 0, left, flags)?;
        req.map_output(synth, 1, right, flags)?;
        req.close_bundle()?;

        req.open_bundle(Timestamp::At(now + self.config.latency));
        req.activate(synth)?;
        req.close_bundle()?;
        req.send()?;

        self.voices.insert(voice, synth);
        tracing::info!(
            voice,
            synth = %synth,
            path = %sound.path.display(),
            duration = sound.duration,
            amp = amplitude,
            "voice started"
        );
        Ok(Some(synth))
    }

    /// Set the amplitude of a playing voice.
    pub fn update_voice(&mut self, voice: VoiceId, amplitude: f32) -> Result<()> {
        let Some(&synth) = self.voices.get(&voice) else {
            tracing::error!(voice, "update of a voice that is not playing");
            return Err(Error::UnknownVoice(voice));
        };
        let mut req = self.engine.request();
        req.set(synth, 0, amplitude)?;
        req.send()?;
        Ok(())
    }

    /// Free the voice's synth after the latency margin. Does nothing for a
    /// voice that is not playing.
    pub fn stop_voice(&mut self, voice: VoiceId) -> Result<()> {
        let Some(&synth) = self.voices.get(&voice) else {
            return Ok(());
        };
        let now = self.engine.current_time();

        let mut req = self.engine.request();
        req.open_bundle(Timestamp::At(now + self.config.latency));
        req.free(synth)?;
        req.close_bundle()?;
        req.send()?;

        self.voices.remove(&voice);
        tracing::debug!(voice, synth = %synth, "voice stopped");
        Ok(())
    }

    /// Open `path` and append it to the sound library, returning its index.
    pub fn add_sound(&mut self, api: &dyn SoundFileApi, path: impl AsRef<Path>) -> Result<usize> {
        let sound = Sound::open(api, path)?;
        tracing::debug!(path = %sound.path.display(), duration = sound.duration, "sound added");
        self.sounds.push(sound);
        Ok(self.sounds.len() - 1)
    }

    /// Next sound index, cycling through the library.
    pub fn next_sound(&mut self) -> usize {
        let index = self.next_sound;
        self.next_sound += 1;
        if self.next_sound >= self.sounds.len() {
            self.next_sound = 0;
        }
        index
    }

    pub fn voice(&self, voice: VoiceId) -> Option<SynthId> {
        self.voices.get(&voice).copied()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voice_group(&self) -> GroupId {
        self.voice_group
    }

    pub fn sounds(&self) -> &SoundLibrary {
        &self.sounds
    }

    pub fn sound(&self, index: usize) -> Option<&Sound> {
        self.sounds.get(index)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}
