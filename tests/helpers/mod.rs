//! Test helpers and fixtures for Ostinato integration tests
//!
//! Sessions run against the render engine for exact, clock-free command
//! streams, or against the live engine with manual block processing.

#![allow(dead_code)]

use std::path::Path;

use ostinato::core::protocol::{self, Element};
use ostinato::prelude::*;
use ostinato::{CommandFile, CommandProcessor, Record};
use tempfile::TempDir;

/// Sample rate used by test engines.
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Frames per processing block in live tests.
pub const TEST_BLOCK: usize = 480;

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Write a mono 16-bit WAV file of `frames` silent frames.
pub fn write_wav(path: &Path, frames: u32, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create test WAV");
    for _ in 0..frames {
        writer.write_sample(0i16).expect("write test sample");
    }
    writer.finalize().expect("finalize test WAV");
}

/// Directory of `count` WAV files, 0.5 s, 1 s, 1.5 s, ...
pub fn sound_dir(count: usize) -> (TempDir, SoundLibrary) {
    let dir = tempfile::tempdir().expect("temp dir");
    let paths: Vec<_> = (0..count)
        .map(|i| {
            let path = dir.path().join(format!("sound{}.wav", i));
            write_wav(&path, 500 * (i as u32 + 1), 1000);
            path
        })
        .collect();
    let sounds = SoundLibrary::from_paths(&HoundSoundFileApi, &paths);
    (dir, sounds)
}

pub fn registry() -> PluginRegistry {
    PluginRegistry::new()
        .with_library(&sampler())
        .with_library(&disk_sampler())
}

pub fn test_options() -> EngineOptions {
    EngineOptions {
        sample_rate: TEST_SAMPLE_RATE,
        plugin_libraries: vec!["sampler".into(), "disksampler".into()],
        ..Default::default()
    }
}

/// Live session plus the processor that would run in the audio callback.
pub fn live_session(
    sounds: SoundLibrary,
    options: EngineOptions,
) -> (Session<LiveEngine>, CommandProcessor) {
    let (engine, processor) = LiveEngine::new(options, registry()).expect("live engine");
    let session = SessionBuilder::new()
        .sounds(sounds)
        .build(engine)
        .expect("session");
    (session, processor)
}

/// Session recording into a command file at `path`.
pub fn render_session(path: &Path, sounds: SoundLibrary) -> Session<RenderEngine> {
    let engine = RenderEngine::create(path, test_options(), registry()).expect("render engine");
    SessionBuilder::new()
        .sounds(sounds)
        .build(engine)
        .expect("session")
}

pub fn read_records(path: &Path) -> Vec<Record> {
    CommandFile::open(path)
        .expect("open command file")
        .read_all()
        .expect("read command file")
}

/// Addresses of every message in a record, depth first.
pub fn addresses(record: &Record) -> Vec<String> {
    record
        .decode()
        .expect("decode record")
        .messages()
        .iter()
        .map(|m| m.address.clone())
        .collect()
}

/// Run one block and decode everything dispatched, with its frame offset.
pub fn process_block(processor: &mut CommandProcessor) -> Vec<(usize, Element)> {
    let mut out = Vec::new();
    processor.process(TEST_BLOCK, |d| {
        out.push((d.frame_offset, protocol::decode(d.bytes).expect("decode packet")))
    });
    out
}
