//! Voice lifecycle integration tests
//!
//! Sessions record into a command file; assertions are made on the decoded
//! records.

use approx::assert_relative_eq;
use ostinato::core::command::address;
use ostinato::core::protocol::Element;
use ostinato::core::{BusMappingFlags, Command, NodeId, Timestamp};
use ostinato::prelude::*;
use ostinato::{Error, SynthId, Value, DEFAULT_LATENCY};

use crate::helpers::*;

#[test]
fn test_start_voice_construct_then_activate() {
    init_tracing();
    let (dir, sounds) = sound_dir(2);
    let path = dir.path().join("start.osc");

    let mut session = render_session(&path, sounds);
    session.engine_mut().set_time(2.0);
    let synth = session.start_voice(1, 1, 0.75).unwrap().unwrap();
    let sound_path = session.sound(1).unwrap().path_str();
    session.into_engine().finish().unwrap();

    let records = read_records(&path);
    assert_eq!(records.len(), 3);
    assert_eq!(addresses(&records[0]), [address::GROUP_NEW]);
    assert_eq!(
        addresses(&records[1]),
        [
            address::SYNTH_NEW,
            address::SYNTH_MAP_OUTPUT,
            address::SYNTH_MAP_OUTPUT,
            address::SYNTH_ACTIVATE
        ]
    );

    let commands = records[1].commands().unwrap();
    match &commands[0] {
        Command::SynthNew {
            synth: created,
            controls,
            options,
            ..
        } => {
            assert_eq!(*created, synth);
            assert_eq!(controls, &vec![0.75]);
            assert_eq!(options, &vec![Value::from(sound_path), Value::Int(1)]);
        }
        other => panic!("expected synth creation, got {:?}", other),
    }
    for (command, bus) in commands[1..3].iter().zip([1, 2]) {
        match command {
            Command::SynthMapOutput {
                bus: mapped, flags, ..
            } => {
                assert_eq!(mapped.0, bus);
                assert_eq!(*flags, BusMappingFlags::INTERNAL);
            }
            other => panic!("expected output mapping, got {:?}", other),
        }
    }

    let Element::Bundle(outer) = records[1].decode().unwrap() else {
        panic!("voice start must be a bundle");
    };
    assert_eq!(outer.time, Timestamp::Immediate);
    let [Element::Bundle(construct), Element::Bundle(activate)] = &outer.elements[..] else {
        panic!("expected construction and activation bundles");
    };
    assert_eq!(construct.time, Timestamp::Immediate);
    let Timestamp::At(at) = activate.time else {
        panic!("activation must be scheduled");
    };
    assert_relative_eq!(at, 2.0 + DEFAULT_LATENCY, epsilon = 1e-6);
}

#[test]
fn test_restarting_voice_frees_previous_synth() {
    let (dir, sounds) = sound_dir(2);
    let path = dir.path().join("restart.osc");

    let mut session = render_session(&path, sounds);
    let first = session.start_voice(9, 0, 1.0).unwrap().unwrap();
    let second = session.start_voice(9, 1, 1.0).unwrap().unwrap();
    assert_ne!(first, second);
    assert_eq!(session.voice(9), Some(second));
    assert_eq!(session.active_voices(), 1);
    session.into_engine().finish().unwrap();

    let records = read_records(&path);
    // group, start, free, start, options
    assert_eq!(records.len(), 5);

    let frees: Vec<_> = records
        .iter()
        .flat_map(|r| r.commands().unwrap())
        .filter_map(|c| match c {
            Command::NodeFree { node } => Some(node),
            _ => None,
        })
        .collect();
    assert_eq!(frees, [first.id()]);
    let Some(Timestamp::At(at)) = records[2].timestamp() else {
        panic!("free must be scheduled");
    };
    assert_relative_eq!(at, DEFAULT_LATENCY, epsilon = 1e-6);

    let created: Vec<SynthId> = records[3]
        .commands()
        .unwrap()
        .into_iter()
        .filter_map(|c| match c {
            Command::SynthNew { synth, .. } => Some(synth),
            _ => None,
        })
        .collect();
    assert_eq!(created, [second]);
}

#[test]
fn test_stop_unknown_voice_sends_nothing() {
    let (dir, sounds) = sound_dir(1);
    let path = dir.path().join("stop.osc");

    let mut session = render_session(&path, sounds);
    session.stop_voice(42).unwrap();
    assert_eq!(session.engine().records_written(), 1);

    session.start_voice(1, 0, 0.5).unwrap();
    session.stop_voice(1).unwrap();
    session.stop_voice(1).unwrap();
    assert_eq!(session.engine().records_written(), 3);
    assert_eq!(session.voice(1), None);
}

#[test]
fn test_update_voice() {
    let (dir, sounds) = sound_dir(1);
    let path = dir.path().join("update.osc");

    let mut session = render_session(&path, sounds);
    let synth = session.start_voice(3, 0, 0.2).unwrap().unwrap();
    session.update_voice(3, 0.9).unwrap();
    assert!(matches!(
        session.update_voice(4, 0.9),
        Err(Error::UnknownVoice(4))
    ));
    session.into_engine().finish().unwrap();

    let records = read_records(&path);
    assert_eq!(records.len(), 4);
    assert_eq!(records[2].timestamp(), None);
    assert_eq!(
        records[2].commands().unwrap(),
        [Command::NodeSet {
            node: synth.id(),
            index: 0,
            value: 0.9
        }]
    );
}

#[test]
fn test_invalid_sound_stops_previous_voice() {
    let (dir, sounds) = sound_dir(1);
    let path = dir.path().join("invalid.osc");

    let mut session = render_session(&path, sounds);
    session.start_voice(5, 0, 1.0).unwrap();
    assert_eq!(session.start_voice(5, 3, 1.0).unwrap(), None);
    assert_eq!(session.voice(5), None);
    session.into_engine().finish().unwrap();

    let records = read_records(&path);
    assert_eq!(addresses(&records[2]), [address::NODE_FREE]);
    assert_eq!(records.len(), 4);
}

#[test]
fn test_zero_latency_and_custom_outputs() {
    let (dir, sounds) = sound_dir(1);
    let path = dir.path().join("zero.osc");

    let engine = RenderEngine::create(&path, test_options(), registry()).unwrap();
    let mut session = SessionBuilder::new()
        .sounds(sounds)
        .latency(0.0)
        .synth(ostinato::sampler::sampler_uri())
        .outputs(AudioBusId(0), AudioBusId(1), BusMappingFlags::EXTERNAL)
        .looping(false)
        .build(engine)
        .unwrap();
    let synth = session.start_voice(1, 0, 1.0).unwrap().unwrap();
    session.stop_voice(1).unwrap();
    session.into_engine().finish().unwrap();

    let records = read_records(&path);
    let commands = records[1].commands().unwrap();
    assert!(matches!(
        &commands[0],
        Command::SynthNew { uri, options, .. }
            if *uri == ostinato::sampler::sampler_uri() && options[1] == Value::Int(0)
    ));
    assert!(matches!(
        commands[2],
        Command::SynthMapOutput { bus: AudioBusId(1), flags: BusMappingFlags::EXTERNAL, .. }
    ));
    assert_eq!(records[2].timestamp(), Some(Timestamp::At(0.0)));
    assert_eq!(
        records[2].commands().unwrap(),
        [Command::NodeFree {
            node: NodeId::from(synth)
        }]
    );
}

#[test]
fn test_add_sound_at_runtime() {
    let (dir, sounds) = sound_dir(1);
    let path = dir.path().join("added.osc");
    let mut session = render_session(&path, sounds);

    let missing = dir.path().join("missing.wav");
    assert!(matches!(
        session.add_sound(&HoundSoundFileApi, &missing),
        Err(Error::SoundFile(_))
    ));
    assert_eq!(session.sounds().len(), 1);

    let extra = dir.path().join("extra.wav");
    write_wav(&extra, 250, 1000);
    let index = session.add_sound(&HoundSoundFileApi, &extra).unwrap();
    assert_eq!(index, 1);
    assert_relative_eq!(session.sound(index).unwrap().duration, 0.25);
    assert!(session.start_voice(1, index, 0.5).unwrap().is_some());
}
