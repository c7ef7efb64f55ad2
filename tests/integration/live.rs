//! Live engine integration tests
//!
//! The processor is driven by hand, one block at a time, in place of an audio
//! callback.

use ostinato::core::command::address;
use ostinato::core::protocol::Element;
use ostinato::core::{Command, Error as CoreError, GroupId};
use ostinato::prelude::*;
use ostinato::{CommandProcessor, Error};

use crate::helpers::*;

fn created_group(element: &Element) -> GroupId {
    match Command::from_message(element.messages()[0]).unwrap() {
        Command::GroupNew { group, .. } => group,
        other => panic!("expected group creation, got {:?}", other),
    }
}

#[test]
fn test_dispatch_order_across_blocks() {
    init_tracing();
    let (mut engine, mut processor) = LiveEngine::new(test_options(), registry()).unwrap();

    // 0.015 s is frame 720, 0.005 s is frame 240.
    let mut groups = Vec::new();
    for time in [Some(0.015), Some(0.005), None, Some(0.005)] {
        let mut req = engine.request();
        if let Some(time) = time {
            req.open_bundle(Timestamp::At(time));
        }
        groups.push(req.group(NodePlacement::tail(ROOT_GROUP)).unwrap());
        if time.is_some() {
            req.close_bundle().unwrap();
        }
        req.send().unwrap();
    }

    let first: Vec<_> = process_block(&mut processor)
        .iter()
        .map(|(offset, element)| (*offset, created_group(element)))
        .collect();
    assert_eq!(first, [(0, groups[2]), (240, groups[1]), (240, groups[3])]);
    assert_eq!(processor.pending_count(), 1);

    let second: Vec<_> = process_block(&mut processor)
        .iter()
        .map(|(offset, element)| (*offset, created_group(element)))
        .collect();
    assert_eq!(second, [(240, groups[0])]);
    assert_eq!(processor.pending_count(), 0);
    assert_eq!(engine.packet_pool().available(), engine.packet_pool().capacity());
}

/// Absolute frame and address of everything dispatched over `blocks` blocks.
fn run_blocks(processor: &mut CommandProcessor, blocks: usize) -> Vec<(u64, String)> {
    let mut dispatched = Vec::new();
    for _ in 0..blocks {
        let start = processor.clock().frames();
        for (offset, element) in process_block(processor) {
            let Element::Message(m) = element else {
                panic!("dispatches carry single messages");
            };
            dispatched.push((start + offset as u64, m.address));
        }
    }
    dispatched
}

#[test]
fn test_voice_activation_lands_after_latency() {
    let (_dir, sounds) = sound_dir(1);
    let (engine, mut processor) = LiveEngine::new(test_options(), registry()).unwrap();
    let mut session = SessionBuilder::new()
        .sounds(sounds)
        .latency(0.105)
        .build(engine)
        .unwrap();
    process_block(&mut processor);

    // Started at 0.01 s: activation due at 0.115 s, frame 5520.
    session.start_voice(1, 0, 0.5).unwrap();
    let started = run_blocks(&mut processor, 1);
    assert_eq!(
        started,
        [
            (480, address::SYNTH_NEW.to_string()),
            (480, address::SYNTH_MAP_OUTPUT.to_string()),
            (480, address::SYNTH_MAP_OUTPUT.to_string()),
        ]
    );

    // Stopped at 0.02 s: free due at 0.125 s, frame 6000.
    session.stop_voice(1).unwrap();
    let later = run_blocks(&mut processor, 13);
    assert_eq!(
        later,
        [
            (5520, address::SYNTH_ACTIVATE.to_string()),
            (6000, address::NODE_FREE.to_string()),
        ]
    );
    assert!(later[0].0 as f64 >= (0.01 + 0.105) * TEST_SAMPLE_RATE as f64);
    assert_eq!(processor.pending_count(), 0);
}

#[test]
fn test_pool_exhaustion_recovers_after_processing() {
    let (_dir, sounds) = sound_dir(2);
    let options = EngineOptions {
        packet_count: 2,
        ..test_options()
    };
    let (mut session, mut processor) = live_session(sounds, options);

    // The group creation holds one packet until processed.
    session.start_voice(1, 0, 1.0).unwrap();
    assert!(matches!(
        session.start_voice(2, 1, 1.0),
        Err(Error::Core(CoreError::PacketPoolExhausted { capacity: 2 }))
    ));
    assert_eq!(session.voice(2), None);
    assert_eq!(session.active_voices(), 1);

    // Group creation and the voice's construction; activation is still pending.
    assert_eq!(process_block(&mut processor).len(), 4);
    assert_eq!(processor.pending_count(), 1);
    let synth = session.start_voice(2, 1, 1.0).unwrap();
    assert!(synth.is_some());
    assert_eq!(session.active_voices(), 2);
}

#[test]
fn test_failed_request_releases_ids() {
    let (mut engine, _processor) = LiveEngine::new(
        EngineOptions {
            packet_count: 1,
            ..test_options()
        },
        registry(),
    )
    .unwrap();

    let mut req = engine.request();
    let first = req.group(NodePlacement::tail(ROOT_GROUP)).unwrap();
    req.send().unwrap();

    // Pool is empty; the group id must be handed back.
    let mut req = engine.request();
    let second = req.group(NodePlacement::tail(ROOT_GROUP)).unwrap();
    assert!(req.send().is_err());

    let mut req = engine.request();
    let third = req.group(NodePlacement::tail(ROOT_GROUP)).unwrap();
    assert_ne!(third, first);
    assert_eq!(third, second);
}
