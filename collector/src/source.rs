//! Sample sources.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Upper bound (exclusive) of the synthetic reading range.
pub const SYNTHETIC_VALUE_BOUND: i32 = 50;

/// Produces raw sensor readings for the collector.
pub trait SampleSource {
    fn next_value(&mut self) -> i32;
}

/// Synthetic source: uniform readings in `[0, 50)`, standing in for a
/// physical sensor.
#[derive(Debug)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic readings for tests and simulations.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for RandomSource {
    fn next_value(&mut self) -> i32 {
        self.rng.random_range(0..SYNTHETIC_VALUE_BOUND)
    }
}

/// Replays a fixed sequence, then repeats its last element.
#[cfg(any(test, feature = "dev-context-only-utils"))]
#[derive(Debug)]
pub struct SequenceSource {
    values: Vec<i32>,
    at: usize,
}

#[cfg(any(test, feature = "dev-context-only-utils"))]
impl SequenceSource {
    pub fn new(values: Vec<i32>) -> Self {
        assert!(!values.is_empty(), "sequence source needs at least one value");
        Self { values, at: 0 }
    }
}

#[cfg(any(test, feature = "dev-context-only-utils"))]
impl SampleSource for SequenceSource {
    fn next_value(&mut self) -> i32 {
        let value = self.values[self.at.min(self.values.len() - 1)];
        self.at = self.at.saturating_add(1);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_source_stays_in_range() {
        let mut source = RandomSource::seeded(7);
        for _ in 0..1000 {
            let value = source.next_value();
            assert!((0..SYNTHETIC_VALUE_BOUND).contains(&value));
        }
    }

    #[test]
    fn test_sequence_source_replays_then_repeats() {
        let mut source = SequenceSource::new(vec![3, 1, 4]);
        assert_eq!(source.next_value(), 3);
        assert_eq!(source.next_value(), 1);
        assert_eq!(source.next_value(), 4);
        assert_eq!(source.next_value(), 4);
    }
}
