//! Trickle timer (RFC 6206).
//!
//! Drives the dissemination cadence: a current interval `I` that doubles on
//! quiet expiry up to `Imin << max_doublings`, a redundancy counter `c`
//! incremented for every consistent packet heard, and one fire point `t`
//! drawn uniformly from `[I/2, I)` per interval. The fire is delivered with
//! a suppress flag (`c >= k`) rather than being swallowed, so the caller
//! decides what suppression means.
//!
//! The timer never sleeps. Callers ask [`TrickleTimer::poll_at`] for the
//! next deadline, wait however they like, then call [`TrickleTimer::poll`]
//! with the current instant. Explicit instants keep every test
//! deterministic.

use {
    crate::config::DisseminationConfig,
    rand::{rngs::StdRng, Rng, SeedableRng},
    std::time::{Duration, Instant},
};

/// A due transmission opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrickleFire {
    /// True when the redundancy counter reached k and the transmission
    /// should be skipped.
    pub suppress: bool,
    /// Interval in force when the fire point was drawn.
    pub interval: Duration,
    /// Consistent packets heard so far in this interval.
    pub counter: u32,
}

#[derive(Debug)]
pub struct TrickleTimer {
    imin: Duration,
    imax: Duration,
    k: u32,
    /// Current interval I.
    interval: Duration,
    /// Redundancy counter c, reset at every interval start.
    counter: u32,
    /// Deadline of this interval's fire point t.
    fire_at: Instant,
    /// End of the current interval.
    interval_ends: Instant,
    /// Whether this interval's fire was already delivered.
    fired: bool,
    rng: StdRng,
}

impl TrickleTimer {
    /// Start a timer at `Imin`, first interval beginning at `now`.
    pub fn new(config: &DisseminationConfig, now: Instant) -> Self {
        Self::with_rng(config, now, StdRng::from_os_rng())
    }

    /// Deterministic construction for tests and simulations.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn seeded(config: &DisseminationConfig, now: Instant, seed: u64) -> Self {
        Self::with_rng(config, now, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &DisseminationConfig, now: Instant, rng: StdRng) -> Self {
        let mut timer = Self {
            imin: config.imin,
            imax: config.imax(),
            k: config.redundancy_constant,
            interval: config.imin,
            counter: 0,
            fire_at: now,
            interval_ends: now,
            fired: false,
            rng,
        };
        timer.begin_interval(now);
        timer
    }

    /// Next instant at which `poll` can make progress.
    pub fn poll_at(&self) -> Instant {
        if self.fired {
            self.interval_ends
        } else {
            self.fire_at
        }
    }

    /// Advance the timer to `now`. Returns the fire event when the fire
    /// point of the current interval has been reached and not yet
    /// delivered. At most one fire is returned per call; intervals that
    /// expired entirely while the caller was away are rolled over (each
    /// one doubles) without replaying their stale fires.
    pub fn poll(&mut self, now: Instant) -> Option<TrickleFire> {
        while now >= self.interval_ends {
            self.double_interval();
            let start = self.interval_ends;
            self.begin_interval(start);
        }
        if !self.fired && now >= self.fire_at {
            self.fired = true;
            return Some(TrickleFire {
                suppress: self.counter >= self.k,
                interval: self.interval,
                counter: self.counter,
            });
        }
        None
    }

    /// A consistent packet was heard.
    pub fn hear_consistent(&mut self) {
        self.counter = self.counter.saturating_add(1);
    }

    /// An inconsistent packet was heard. Shrinks the interval back to
    /// `Imin` unless it is already there.
    pub fn hear_inconsistent(&mut self, now: Instant) {
        if self.interval > self.imin {
            self.interval = self.imin;
            self.begin_interval(now);
        }
    }

    /// An external event (new data) demands a fresh round of dissemination.
    /// Restarts at `Imin` unconditionally.
    pub fn reset_event(&mut self, now: Instant) {
        self.interval = self.imin;
        self.begin_interval(now);
    }

    /// Interval currently in force.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Consistent packets heard in the current interval.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    fn begin_interval(&mut self, start: Instant) {
        let half = self.interval / 2;
        let t = if half < self.interval {
            self.rng.random_range(half..self.interval)
        } else {
            half
        };
        self.counter = 0;
        self.fired = false;
        self.fire_at = start + t;
        self.interval_ends = start + self.interval;
    }

    fn double_interval(&mut self) {
        self.interval = self.interval.saturating_mul(2).min(self.imax);
    }
}
