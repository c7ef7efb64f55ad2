//! Sound-file capability interface.
//!
//! Decoding backends implement [`SoundFileApi`]; the core only sees open
//! handles. Every operation reports a typed [`SoundFileError`] instead of
//! panicking. Handles close when dropped.

use std::path::Path;

use thiserror::Error;

/// Error codes for sound-file operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoundFileError {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Unsupported sound file format: {0}")]
    UnsupportedFormat(String),

    #[error("Sound file I/O error: {0}")]
    Io(String),

    #[error("Unspecified sound file error: {0}")]
    Unspecified(String),
}

impl From<std::io::Error> for SoundFileError {
    fn from(e: std::io::Error) -> Self {
        SoundFileError::Io(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    Write,
}

/// Format of an open file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundFileInfo {
    pub frames: u64,
    pub channels: u16,
    pub sample_rate: u32,
}

impl SoundFileInfo {
    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// An open sound file.
pub trait SoundFile: Send {
    /// Move to an absolute frame position.
    fn seek(&mut self, frame: u64) -> Result<(), SoundFileError>;

    /// Current frame position.
    fn tell(&mut self) -> Result<u64, SoundFileError>;

    /// Read up to `frames` interleaved frames as f32; returns frames read.
    ///
    /// `buffer` must hold at least `frames * channels` samples.
    fn read_float(&mut self, buffer: &mut [f32], frames: usize) -> Result<usize, SoundFileError>;
}

/// Opens sound files.
pub trait SoundFileApi: Send + Sync {
    fn open(
        &self,
        path: &Path,
        mode: FileMode,
    ) -> Result<(Box<dyn SoundFile>, SoundFileInfo), SoundFileError>;
}
