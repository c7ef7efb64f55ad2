//! Real-time engine: packets cross to the audio context through a
//! lock-free ring and are dispatched sample-accurately.

use std::ops::Range;

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

use super::{Engine, SampleClock};
use crate::error::{Error, Result};
use crate::node_ids::NodeIdAllocator;
use crate::options::EngineOptions;
use crate::packet::{Packet, PacketPool};
use crate::plugin::PluginRegistry;
use crate::protocol::{self, Time, Timestamp};

/// Control-side handle of a live engine.
pub struct LiveEngine {
    options: EngineOptions,
    node_ids: NodeIdAllocator,
    pool: PacketPool,
    plugins: PluginRegistry,
    clock: SampleClock,
    outbox: HeapProd<Packet>,
}

impl LiveEngine {
    /// Create the engine and the processor that belongs in the audio
    /// callback.
    pub fn new(options: EngineOptions, plugins: PluginRegistry) -> Result<(Self, CommandProcessor)> {
        options.validate()?;

        let pool = options.packet_pool();
        let (outbox, inbox) = HeapRb::new(pool.capacity()).split();
        let clock = SampleClock::new(options.sample_rate);

        let processor = CommandProcessor {
            inbox,
            pending: Vec::with_capacity(pool.capacity()),
            clock: clock.clone(),
        };

        tracing::info!(
            sample_rate = options.sample_rate,
            packets = pool.capacity(),
            packet_size = pool.packet_size(),
            libraries = ?plugins.library_names(),
            "live engine started"
        );

        let engine = Self {
            node_ids: options.node_id_allocator(),
            options,
            pool,
            plugins,
            clock,
            outbox,
        };
        Ok((engine, processor))
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn clock(&self) -> &SampleClock {
        &self.clock
    }

    pub fn packet_pool(&self) -> &PacketPool {
        &self.pool
    }
}

impl Engine for LiveEngine {
    fn node_ids(&mut self) -> &mut NodeIdAllocator {
        &mut self.node_ids
    }

    fn alloc_packet(&mut self) -> Result<Packet> {
        self.pool.allocate()
    }

    fn send_packet(&mut self, packet: Packet) -> Result<()> {
        // A rejected packet goes straight back to the pool.
        self.outbox.try_push(packet).map_err(|_| {
            tracing::warn!("command queue full, packet dropped");
            Error::CommandQueueFull
        })
    }

    fn current_time(&self) -> Time {
        self.clock.time()
    }

    fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }
}

/// One message handed to the audio graph.
#[derive(Debug)]
pub struct Dispatch<'a> {
    /// Frame inside the current block at which the message takes effect.
    pub frame_offset: usize,
    /// Latest time tag among the message's enclosing bundles.
    pub time: Timestamp,
    /// The encoded OSC message.
    pub bytes: &'a [u8],
}

/// A packet with messages left to dispatch.
struct Scheduled {
    due_frame: u64,
    time: Timestamp,
    packet: Packet,
    /// Byte range of the next message.
    message: Range<usize>,
}

fn due_frame(clock: &SampleClock, time: Timestamp) -> u64 {
    match time {
        Timestamp::Immediate => 0,
        Timestamp::At(t) => clock.frame_at(t),
    }
}

/// Audio-context side of a live engine.
///
/// Never allocates: the pending queue is sized to the packet pool, which
/// bounds how many packets can exist at once.
pub struct CommandProcessor {
    inbox: HeapCons<Packet>,
    pending: Vec<Scheduled>,
    clock: SampleClock,
}

impl CommandProcessor {
    /// Run one block of `frames` frames.
    ///
    /// Every message due before the end of the block is passed to `dispatch`
    /// in time order, then its packet is released once empty. A message is
    /// due at the latest time tag among its enclosing bundles, so a bundle
    /// nested in an immediate one still waits for its own time. Messages of
    /// one packet keep their order; equal times across packets keep
    /// submission order. Late messages run at offset 0. The clock advances
    /// by `frames`.
    pub fn process(&mut self, frames: usize, mut dispatch: impl FnMut(Dispatch<'_>)) {
        let start = self.clock.frames();
        let end = start + frames as u64;

        while let Some(packet) = self.inbox.try_pop() {
            // Empty or malformed packets go straight back to the pool.
            let Some((message, time)) = protocol::next_message(packet.as_bytes(), 0) else {
                continue;
            };
            self.pending.push(Scheduled {
                due_frame: due_frame(&self.clock, time),
                time,
                packet,
                message,
            });
        }

        while let Some(index) = self.next_due(end) {
            let scheduled = &mut self.pending[index];
            dispatch(Dispatch {
                frame_offset: scheduled.due_frame.saturating_sub(start) as usize,
                time: scheduled.time,
                bytes: &scheduled.packet.as_bytes()[scheduled.message.clone()],
            });

            match protocol::next_message(scheduled.packet.as_bytes(), scheduled.message.end) {
                Some((message, time)) => {
                    scheduled.due_frame = scheduled.due_frame.max(due_frame(&self.clock, time));
                    scheduled.time = time;
                    scheduled.message = message;
                }
                None => {
                    self.pending.remove(index);
                }
            }
        }

        self.clock.advance(frames as u64);
    }

    /// Earliest packet whose next message is due before `end`; first
    /// submitted wins ties.
    fn next_due(&self, end: u64) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (index, scheduled) in self.pending.iter().enumerate() {
            if scheduled.due_frame >= end {
                continue;
            }
            match best {
                Some((_, frame)) if frame <= scheduled.due_frame => {}
                _ => best = Some((index, scheduled.due_frame)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Packets received with messages not yet dispatched.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clock(&self) -> &SampleClock {
        &self.clock
    }
}
