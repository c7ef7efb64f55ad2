//! Render engine integration tests
//!
//! A session rendered to a command file must be replayable on its own: the
//! records hold every command in order and end with the engine options.

use ostinato::core::command::address;
use ostinato::core::{Command, Timestamp};
use ostinato::prelude::*;
use ostinato::render::render;

use crate::helpers::*;

#[test]
fn test_rendered_session_replays() {
    init_tracing();
    let (dir, sounds) = sound_dir(3);
    let path = dir.path().join("session.osc");

    let summary = render(&path, test_options(), registry(), |engine| {
        let mut req = engine.request();
        let group = req.group(NodePlacement::tail(ROOT_GROUP))?;
        req.send()?;

        let uri = ostinato::sampler::sampler_uri();
        for (i, sound) in sounds.iter().enumerate() {
            let now = engine.current_time();
            let mut req = engine.request();
            req.open_bundle(Timestamp::Immediate);
            let synth = req.synth(
                &uri,
                NodePlacement::tail(group),
                &[0.5],
                &[Value::from(sound.path_str()), Value::from(false)],
            )?;
            req.close_bundle()?;
            req.open_bundle(Timestamp::At(now + 0.25));
            req.activate(synth)?;
            req.close_bundle()?;
            req.send()?;
            engine.advance(1.0 + i as f64);
        }
        Ok(())
    })
    .unwrap();

    // One group, three voices, options.
    assert_eq!(summary.records, 1 + 3 + 1);
    assert_eq!(summary.end_time, 6.0);

    let records = read_records(&path);
    assert_eq!(records.len(), summary.records);
    assert_eq!(addresses(&records[0]), [address::GROUP_NEW]);
    for record in &records[1..4] {
        assert_eq!(
            addresses(record),
            [address::SYNTH_NEW, address::SYNTH_ACTIVATE]
        );
    }

    let options = records.last().unwrap();
    assert_eq!(options.timestamp(), Some(Timestamp::At(0.0)));
    let replayed = options.engine_options().unwrap();
    assert_eq!(replayed, test_options());
    assert_eq!(replayed.plugin_libraries, ["sampler", "disksampler"]);
}

#[test]
fn test_failed_callback_leaves_no_options_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failed.osc");

    let result = render(&path, test_options(), registry(), |engine| {
        let mut req = engine.request();
        req.group(NodePlacement::tail(ROOT_GROUP))?;
        req.send()?;
        let mut req = engine.request();
        req.synth("urn:ostinato:plugins/missing", NodePlacement::tail(ROOT_GROUP), &[], &[])?;
        req.send()
    });
    assert!(matches!(
        result,
        Err(ostinato::core::Error::UnknownPlugin(_))
    ));

    let records = read_records(&path);
    assert_eq!(records.len(), 1);
    assert!(records[0]
        .commands()
        .unwrap()
        .iter()
        .all(|c| !matches!(c, Command::EngineOption { .. })));
}

#[test]
fn test_render_session_into_engine() {
    let (dir, sounds) = sound_dir(2);
    let path = dir.path().join("voices.osc");

    let mut session = render_session(&path, sounds);
    let voices: Vec<_> = (0..4u64)
        .map(|voice| {
            let sound = session.next_sound();
            session.start_voice(voice, sound, 0.5).unwrap().unwrap()
        })
        .collect();
    assert_eq!(session.active_voices(), 4);
    for voice in 0..4 {
        session.stop_voice(voice).unwrap();
    }

    let summary = session.into_engine().finish().unwrap();
    assert_eq!(summary.records, 1 + 4 + 4 + 1);

    let records = read_records(&path);
    let options: Vec<_> = records[1..5]
        .iter()
        .map(|r| match &r.commands().unwrap()[0] {
            Command::SynthNew { options, .. } => options[0].clone(),
            other => panic!("expected synth creation, got {:?}", other),
        })
        .collect();
    // Sounds are picked round-robin.
    assert_eq!(options[0], options[2]);
    assert_eq!(options[1], options[3]);
    assert_ne!(options[0], options[1]);
    assert_eq!(voices.len(), 4);
}
