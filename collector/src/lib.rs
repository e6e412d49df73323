//! Canopy Sample Collection
//!
//! Periodic sampling and batched reporting for sensor nodes:
//!
//! 1. **Tick** — a recurring timer fires every `active_interval / 2`
//!    seconds, where the active interval (short or long) is decided by the
//!    disseminated configuration token.
//! 2. **Sample** — each tick draws one reading, assigns it the next
//!    1-based index, tags it with the interval code that scheduled it (a
//!    one-shot marker covers the tick right after a change), and writes it
//!    into a fixed ring of [`ring::NSAMPLES`] slots.
//! 3. **Report** — every NSAMPLES-th tick yields the full ring as a batch
//!    for delivery to the sink; the index never rewinds, even when the
//!    batch cannot be delivered.
//!
//! The collector is deliberately transport-blind: the node driver routes
//! flushed batches over the unicast rendezvous path or the collection
//! tree.

// Tick scheduling is Instant/Duration arithmetic throughout.
#![allow(clippy::arithmetic_side_effects)]

pub mod collector;
pub mod config;
pub mod ring;
pub mod source;

// Re-exports for convenience
pub use collector::{CollectorOutput, SampleCollector};
pub use config::CollectorConfig;
pub use ring::{PushOutcome, Sample, SampleBatch, SampleRing, NSAMPLES};
pub use source::{RandomSource, SampleSource, SYNTHETIC_VALUE_BOUND};

#[cfg(any(test, feature = "dev-context-only-utils"))]
pub use source::SequenceSource;
