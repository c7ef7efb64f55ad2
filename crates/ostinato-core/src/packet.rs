//! Fixed-capacity pool of outgoing command buffers.
//!
//! Buffers are allocated once when the pool is created. Checking one out
//! and returning it are both O(1) operations on a lock-free bounded queue,
//! so packets may be released from the real-time thread.

use std::fmt;
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

use crate::error::{Error, Result};

/// Default number of packets in flight.
pub const DEFAULT_PACKET_COUNT: usize = 1024;

/// Default size of one packet in bytes.
pub const DEFAULT_PACKET_SIZE: usize = 8192;

struct PoolShared {
    free: ArrayQueue<Vec<u8>>,
    packet_size: usize,
}

/// Pool of pre-allocated packet buffers.
///
/// Clones share the same free list.
#[derive(Clone)]
pub struct PacketPool {
    shared: Arc<PoolShared>,
}

impl PacketPool {
    pub fn new(count: usize, packet_size: usize) -> Self {
        let count = count.max(1);
        let free = ArrayQueue::new(count);
        for _ in 0..count {
            // Cannot fail: the queue was sized for exactly `count` buffers.
            let _ = free.push(Vec::with_capacity(packet_size));
        }
        Self {
            shared: Arc::new(PoolShared { free, packet_size }),
        }
    }

    /// Check out a packet.
    pub fn allocate(&self) -> Result<Packet> {
        match self.shared.free.pop() {
            Some(data) => Ok(Packet {
                data,
                shared: Arc::clone(&self.shared),
            }),
            None => Err(Error::PacketPoolExhausted {
                capacity: self.capacity(),
            }),
        }
    }

    /// Total number of packets.
    pub fn capacity(&self) -> usize {
        self.shared.free.capacity()
    }

    /// Packets currently available for checkout.
    pub fn available(&self) -> usize {
        self.shared.free.len()
    }

    /// Maximum payload size of one packet.
    pub fn packet_size(&self) -> usize {
        self.shared.packet_size
    }
}

impl Default for PacketPool {
    fn default() -> Self {
        Self::new(DEFAULT_PACKET_COUNT, DEFAULT_PACKET_SIZE)
    }
}

impl fmt::Debug for PacketPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketPool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("packet_size", &self.packet_size())
            .finish()
    }
}

/// A checked-out packet buffer.
///
/// Owned by exactly one component at a time. The buffer goes back to its
/// pool when the packet is dropped, so it is released exactly once.
pub struct Packet {
    data: Vec<u8>,
    shared: Arc<PoolShared>,
}

impl Packet {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Maximum payload size.
    pub fn capacity(&self) -> usize {
        self.shared.packet_size
    }

    /// Writable buffer for encoders. Call [`Packet::check_size`] afterwards.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    /// Reject payloads that outgrew the packet size.
    pub fn check_size(&mut self) -> Result<()> {
        let size = self.data.len();
        let capacity = self.capacity();
        if size > capacity {
            self.data.clear();
            self.data.shrink_to(capacity);
            return Err(Error::PacketOverflow { size, capacity });
        }
        Ok(())
    }

    /// Return the buffer to the pool.
    pub fn release(self) {
        drop(self)
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        let mut data = std::mem::take(&mut self.data);
        data.clear();
        // The queue has a slot for every buffer this pool created.
        let _ = self.shared.free.push(data);
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet").field("len", &self.len()).finish()
    }
}
