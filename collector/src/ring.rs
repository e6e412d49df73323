//! Fixed-capacity sample ring.
//!
//! Samples land at `counter % NSAMPLES`; the stored index is 1-based and
//! keeps rising across flushes. Because a flush happens exactly when the
//! counter reaches a multiple of NSAMPLES, the slots are always in
//! chronological order at flush time and the ring can be reported as-is.

use serde::{Deserialize, Serialize};

/// Ring capacity and report batch size. Receivers rely on this value to
/// decode batches; the wire carries no length field.
pub const NSAMPLES: usize = 3;

/// One sensor reading.
///
/// Field order is the wire order: three 32-bit fields, host endianness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Sensed value.
    pub value: i32,
    /// 1-based position in the node's lifetime sample sequence.
    pub index: i32,
    /// Interval code in force when this sample was scheduled.
    pub interval_used: i32,
}

/// A full report batch, exactly as sent on the wire.
pub type SampleBatch = [Sample; NSAMPLES];

/// Outcome of recording one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    /// The sample as written, with its assigned index.
    pub sample: Sample,
    /// True when the write completed a batch of NSAMPLES.
    pub flush_due: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SampleRing {
    slots: SampleBatch,
    /// Samples written so far. Equals the last stored 1-based index.
    counter: u32,
}

impl SampleRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples ever written.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Record the next sample.
    pub fn push(&mut self, value: i32, interval_used: i32) -> PushOutcome {
        let slot = (self.counter % NSAMPLES as u32) as usize;
        let sample = Sample {
            value,
            index: self.counter.wrapping_add(1) as i32,
            interval_used,
        };
        self.slots[slot] = sample;
        self.counter = self.counter.wrapping_add(1);
        PushOutcome {
            sample,
            flush_due: self.counter % NSAMPLES as u32 == 0,
        }
    }

    /// Snapshot of the ring in slot order.
    pub fn batch(&self) -> SampleBatch {
        self.slots
    }
}
