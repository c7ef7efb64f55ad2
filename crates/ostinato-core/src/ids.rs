//! Node and bus identifiers, and the bounded allocator that issues them.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier types issued by an [`IdAllocator`].
pub trait ResourceId: Copy + Eq + fmt::Debug {
    /// Human-readable class name used in errors.
    const KIND: &'static str;

    fn from_raw(raw: u32) -> Self;
    fn raw(self) -> u32;
}

/// Address of a node (synth or group) in the synthesis graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A node known to be a synth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SynthId(pub NodeId);

/// A node known to be a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub NodeId);

/// Audio bus number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AudioBusId(pub u32);

/// The group every node tree hangs off. Always live.
pub const ROOT_GROUP: GroupId = GroupId(NodeId(0));

impl ResourceId for NodeId {
    const KIND: &'static str = "node";

    fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

impl ResourceId for AudioBusId {
    const KIND: &'static str = "audio bus";

    fn from_raw(raw: u32) -> Self {
        AudioBusId(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

impl SynthId {
    pub fn id(self) -> NodeId {
        self.0
    }
}

impl GroupId {
    pub fn id(self) -> NodeId {
        self.0
    }
}

impl From<SynthId> for NodeId {
    fn from(id: SynthId) -> Self {
        id.0
    }
}

impl From<GroupId> for NodeId {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SynthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AudioBusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues identifiers from an inclusive range `[min, max]`.
///
/// Always hands out the lowest identifier that is not live, so allocation
/// sequences are reproducible. Identifiers that were never issued are taken
/// from a watermark; freed ones go to a min-heap, and every freed identifier
/// is below the watermark.
#[derive(Debug, Clone)]
pub struct IdAllocator<T: ResourceId> {
    min: u32,
    max: u32,
    next: u64,
    freed: BinaryHeap<Reverse<u32>>,
    live: Vec<bool>,
    live_count: usize,
    _marker: PhantomData<T>,
}

impl<T: ResourceId> IdAllocator<T> {
    /// Create an allocator over `[min, max]`.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`.
    pub fn new(min: u32, max: u32) -> Self {
        assert!(min <= max, "invalid {} range [{}, {}]", T::KIND, min, max);
        let span = (max - min) as usize + 1;
        Self {
            min,
            max,
            next: min as u64,
            freed: BinaryHeap::new(),
            live: vec![false; span],
            live_count: 0,
            _marker: PhantomData,
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Total number of identifiers in the range.
    pub fn capacity(&self) -> usize {
        self.live.len()
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub fn available(&self) -> usize {
        self.capacity() - self.live_count
    }

    pub fn allocate(&mut self) -> Result<T> {
        let raw = if let Some(Reverse(raw)) = self.freed.pop() {
            raw
        } else if self.next <= self.max as u64 {
            let raw = self.next as u32;
            self.next += 1;
            raw
        } else {
            return Err(Error::IdRangeExhausted {
                kind: T::KIND,
                min: self.min,
                max: self.max,
            });
        };

        let slot = (raw - self.min) as usize;
        debug_assert!(!self.live[slot]);
        self.live[slot] = true;
        self.live_count += 1;
        Ok(T::from_raw(raw))
    }

    /// Return an identifier to the free set.
    ///
    /// Freeing an identifier that is not live is an invariant violation: it
    /// would let the same identifier be issued twice.
    pub fn free(&mut self, id: T) -> Result<()> {
        let raw = id.raw();
        let slot = self.slot(raw)?;
        if !self.live[slot] {
            tracing::error!(kind = T::KIND, id = raw, "freeing identifier that is not allocated");
            return Err(Error::IdNotAllocated { kind: T::KIND, id: raw });
        }
        self.live[slot] = false;
        self.live_count -= 1;
        self.freed.push(Reverse(raw));
        Ok(())
    }

    /// Plain query: an identifier outside the range is simply not allocated.
    pub fn is_allocated(&self, id: T) -> bool {
        let raw = id.raw();
        (self.min..=self.max).contains(&raw) && self.live[(raw - self.min) as usize]
    }

    fn slot(&self, raw: u32) -> Result<usize> {
        if raw < self.min || raw > self.max {
            tracing::error!(kind = T::KIND, id = raw, "identifier outside allocator range");
            return Err(Error::IdOutOfRange { kind: T::KIND, id: raw });
        }
        Ok((raw - self.min) as usize)
    }
}
