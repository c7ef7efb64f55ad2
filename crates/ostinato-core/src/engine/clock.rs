use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::protocol::{Time, TIME_TAG_QUANTUM};

/// Sample-accurate transport clock shared between the control side and the
/// audio context. Only the audio context advances it.
#[derive(Debug, Clone)]
pub struct SampleClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

impl SampleClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1) as f64,
        }
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Seconds elapsed since the clock started.
    #[inline]
    pub fn time(&self) -> Time {
        self.frames() as f64 / self.sample_rate
    }

    #[inline]
    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }

    /// First frame at or after `time`.
    ///
    /// Decoded time tags may sit one tag quantum off their frame; that much
    /// slack keeps a tag on an exact frame boundary from slipping a frame.
    #[inline]
    pub fn frame_at(&self, time: Time) -> u64 {
        ((time - TIME_TAG_QUANTUM).max(0.0) * self.sample_rate).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Timestamp;

    #[test]
    fn test_clock_advances() {
        let clock = SampleClock::new(100);
        let reader = clock.clone();
        assert_eq!(reader.time(), 0.0);

        clock.advance(50);
        assert_eq!(reader.frames(), 50);
        assert_eq!(reader.time(), 0.5);
        assert_eq!(reader.frame_at(0.25), 25);
        assert_eq!(reader.frame_at(0.0), 0);
    }

    #[test]
    fn test_frame_at_never_early() {
        let clock = SampleClock::new(1000);
        assert_eq!(clock.frame_at(0.1504), 151);
        assert_eq!(clock.frame_at(0.1501), 151);

        // Tags lose precision below one quantum on the wire.
        let decoded = |t: f64| match Timestamp::from_osc(Timestamp::At(t).to_osc()) {
            Timestamp::At(t) => t,
            Timestamp::Immediate => unreachable!(),
        };
        assert_eq!(clock.frame_at(decoded(0.15)), 150);
        assert_eq!(clock.frame_at(decoded(0.1504)), 151);
        assert_eq!(clock.frame_at(decoded(2.0)), 2000);
    }
}
