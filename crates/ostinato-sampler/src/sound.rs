//! Sound descriptors.

use std::path::{Path, PathBuf};

use ostinato_core::{FileMode, SoundFileApi, SoundFileError};
use serde::{Deserialize, Serialize};

/// A playable sound file and its length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    pub path: PathBuf,
    /// Duration in seconds.
    pub duration: f64,
}

impl Sound {
    /// Read the duration of `path` through `api`. The handle is closed again right away.
    pub fn open(api: &dyn SoundFileApi, path: impl AsRef<Path>) -> Result<Self, SoundFileError> {
        let path = path.as_ref();
        let (_file, info) = api.open(path, FileMode::Read)?;
        Ok(Self {
            path: path.to_path_buf(),
            duration: info.duration(),
        })
    }

    /// Path as a string, the form synth options carry.
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Ordered set of sounds addressed by index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundLibrary {
    sounds: Vec<Sound>,
}

impl SoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every path; files that fail to open are skipped with a warning.
    pub fn from_paths<I, P>(api: &dyn SoundFileApi, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut library = Self::new();
        for path in paths {
            let path = path.as_ref();
            match Sound::open(api, path) {
                Ok(sound) => library.push(sound),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping sound");
                }
            }
        }
        tracing::debug!(count = library.len(), "sound library loaded");
        library
    }

    pub fn push(&mut self, sound: Sound) {
        self.sounds.push(sound);
    }

    pub fn get(&self, index: usize) -> Option<&Sound> {
        self.sounds.get(index)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sound> {
        self.sounds.iter()
    }
}

impl FromIterator<Sound> for SoundLibrary {
    fn from_iter<T: IntoIterator<Item = Sound>>(iter: T) -> Self {
        Self {
            sounds: iter.into_iter().collect(),
        }
    }
}
