//! WAV backend for the sound-file interface.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec};
use ostinato_core::{FileMode, SoundFile, SoundFileApi, SoundFileError, SoundFileInfo};

/// Opens WAV files (integer PCM up to 32 bits, 32-bit float) through hound.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoundSoundFileApi;

impl HoundSoundFileApi {
    pub fn new() -> Self {
        Self
    }
}

impl SoundFileApi for HoundSoundFileApi {
    fn open(
        &self,
        path: &Path,
        mode: FileMode,
    ) -> Result<(Box<dyn SoundFile>, SoundFileInfo), SoundFileError> {
        if mode == FileMode::Write {
            return Err(SoundFileError::Argument(
                "WAV files can only be opened for reading".into(),
            ));
        }

        let reader = WavReader::open(path).map_err(hound_error)?;
        let spec = reader.spec();
        let info = SoundFileInfo {
            frames: reader.duration() as u64,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        };
        tracing::trace!(path = %path.display(), frames = info.frames, channels = info.channels, "opened WAV file");

        let file = WavFile {
            reader,
            spec,
            frames: info.frames,
            position: 0,
        };
        Ok((Box::new(file), info))
    }
}

struct WavFile {
    reader: WavReader<BufReader<File>>,
    spec: WavSpec,
    frames: u64,
    position: u64,
}

impl SoundFile for WavFile {
    fn seek(&mut self, frame: u64) -> Result<(), SoundFileError> {
        if frame > self.frames {
            return Err(SoundFileError::Argument(format!(
                "seek to frame {} past end ({} frames)",
                frame, self.frames
            )));
        }
        let target = u32::try_from(frame)
            .map_err(|_| SoundFileError::Argument(format!("frame {} out of range", frame)))?;
        self.reader.seek(target)?;
        self.position = frame;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64, SoundFileError> {
        Ok(self.position)
    }

    fn read_float(&mut self, buffer: &mut [f32], frames: usize) -> Result<usize, SoundFileError> {
        let channels = self.spec.channels.max(1) as usize;
        if buffer.len() < frames * channels {
            return Err(SoundFileError::Argument(format!(
                "buffer of {} samples too small for {} frames of {} channels",
                buffer.len(),
                frames,
                channels
            )));
        }

        let remaining = (self.frames - self.position) as usize;
        let count = frames.min(remaining) * channels;
        let out = &mut buffer[..count];

        let mut read = 0;
        match self.spec.sample_format {
            SampleFormat::Float => {
                for (slot, sample) in out.iter_mut().zip(self.reader.samples::<f32>()) {
                    *slot = sample.map_err(hound_error)?;
                    read += 1;
                }
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (self.spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                for (slot, sample) in out.iter_mut().zip(self.reader.samples::<i32>()) {
                    *slot = sample.map_err(hound_error)? as f32 * scale;
                    read += 1;
                }
            }
        }

        let frames_read = read / channels;
        self.position += frames_read as u64;
        Ok(frames_read)
    }
}

fn hound_error(e: hound::Error) -> SoundFileError {
    match e {
        hound::Error::IoError(e) => SoundFileError::from(e),
        hound::Error::FormatError(msg) => SoundFileError::UnsupportedFormat(msg.to_string()),
        hound::Error::Unsupported => {
            SoundFileError::UnsupportedFormat("unsupported WAV encoding".into())
        }
        other => SoundFileError::Unspecified(other.to_string()),
    }
}
