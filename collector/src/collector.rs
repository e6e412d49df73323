//! The sampling state machine.
//!
//! Idle between ticks; each due tick draws one sample, tags it with the
//! interval that scheduled it, and writes it into the ring; every
//! NSAMPLES-th tick additionally yields the full ring for reporting. The
//! tick timer re-arms after each sample from whatever interval is active
//! at that moment, so a disseminated interval change takes effect on the
//! very next arm.
//!
//! Like the dissemination engine, the collector never sleeps and performs
//! no I/O: the driver asks [`SampleCollector::poll_at`] for the next
//! deadline and hands flushed batches to the reporting path itself.

use {
    crate::{
        config::CollectorConfig,
        ring::{PushOutcome, Sample, SampleBatch, SampleRing},
        source::SampleSource,
    },
    canopy_dissemination::TokenStore,
    log::*,
    std::time::Instant,
};

/// What one due tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorOutput {
    /// The sample just taken.
    pub sample: Sample,
    /// Present after every NSAMPLES-th sample: the batch to report.
    pub flush: Option<SampleBatch>,
}

#[derive(Debug)]
pub struct SampleCollector {
    config: CollectorConfig,
    ring: SampleRing,
    next_tick: Instant,
}

impl SampleCollector {
    /// The first tick lands half an active period after `now`.
    pub fn new(config: CollectorConfig, store: &TokenStore, now: Instant) -> Self {
        let next_tick = now + config.period(store.active_interval()) / 2;
        Self {
            config,
            ring: SampleRing::new(),
            next_tick,
        }
    }

    /// Deadline of the next sample tick.
    pub fn poll_at(&self) -> Instant {
        self.next_tick
    }

    /// Samples taken over this collector's lifetime.
    pub fn samples_taken(&self) -> u32 {
        self.ring.counter()
    }

    /// Advance the collector to `now`. Draws at most one sample per call.
    ///
    /// The one-shot change marker in the store wins over the active
    /// interval when tagging the sample, and is consumed here; nothing
    /// else ever reads it.
    pub fn poll(
        &mut self,
        now: Instant,
        store: &mut TokenStore,
        source: &mut dyn SampleSource,
    ) -> Option<CollectorOutput> {
        if now < self.next_tick {
            return None;
        }

        let value = source.next_value();
        let interval_used = store
            .take_interval_changed()
            .unwrap_or_else(|| store.active_interval().code());
        let PushOutcome { sample, flush_due } = self.ring.push(value, interval_used);
        info!(
            "[New Sample]: Value = {} | Index = {} | Interval Used = {}",
            sample.value, sample.index, sample.interval_used
        );

        self.next_tick = now + self.config.period(store.active_interval()) / 2;

        Some(CollectorOutput {
            sample,
            flush: flush_due.then(|| self.ring.batch()),
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::source::SequenceSource,
        std::time::Duration,
    };

    fn make_parts() -> (SampleCollector, TokenStore, SequenceSource, Instant) {
        let now = Instant::now();
        let store = TokenStore::new();
        let collector = SampleCollector::new(CollectorConfig::dev_default(), &store, now);
        let source = SequenceSource::new((1..=20).collect());
        (collector, store, source, now)
    }

    /// Step time straight to the next tick and poll once.
    fn tick(
        collector: &mut SampleCollector,
        store: &mut TokenStore,
        source: &mut SequenceSource,
    ) -> CollectorOutput {
        let now = collector.poll_at();
        collector
            .poll(now, store, source)
            .expect("tick must be due at poll_at()")
    }

    #[test]
    fn test_not_due_yields_nothing() {
        let (mut collector, mut store, mut source, now) = make_parts();
        assert_eq!(collector.poll(now, &mut store, &mut source), None);
        assert_eq!(collector.samples_taken(), 0);
    }

    #[test]
    fn test_flush_on_every_third_tick() {
        let (mut collector, mut store, mut source, _) = make_parts();

        let mut flush_points = Vec::new();
        for nth in 1..=9 {
            let output = tick(&mut collector, &mut store, &mut source);
            assert_eq!(output.sample.index, nth);
            if let Some(batch) = output.flush {
                flush_points.push((nth, batch.map(|s| s.index)));
            }
        }

        assert_eq!(
            flush_points,
            vec![(3, [1, 2, 3]), (6, [4, 5, 6]), (9, [7, 8, 9])]
        );
    }

    #[test]
    fn test_values_come_from_the_source() {
        let (mut collector, mut store, _, _) = make_parts();
        let mut source = SequenceSource::new(vec![42, 7]);

        let first = tick(&mut collector, &mut store, &mut source);
        let second = tick(&mut collector, &mut store, &mut source);
        assert_eq!(first.sample.value, 42);
        assert_eq!(second.sample.value, 7);
    }

    #[test]
    fn test_one_shot_marker_tags_exactly_one_sample() {
        let (mut collector, mut store, mut source, _) = make_parts();

        // A targeted change arrives between ticks.
        store.toggle_active_interval();

        let first = tick(&mut collector, &mut store, &mut source);
        assert_eq!(
            first.sample.interval_used, 1,
            "first sample after the change carries the pre-change code"
        );

        let second = tick(&mut collector, &mut store, &mut source);
        assert_eq!(
            second.sample.interval_used, 2,
            "later samples carry the now-active code"
        );
    }

    #[test]
    fn test_rearm_follows_the_active_interval() {
        let (mut collector, mut store, mut source, _) = make_parts();

        // Short is active: ticks are half of 200 ms apart.
        let t1 = collector.poll_at();
        collector.poll(t1, &mut store, &mut source);
        assert_eq!(collector.poll_at() - t1, Duration::from_millis(100));

        // After a toggle the next arm uses the long period.
        store.toggle_active_interval();
        let t2 = collector.poll_at();
        collector.poll(t2, &mut store, &mut source);
        assert_eq!(collector.poll_at() - t2, Duration::from_millis(200));
    }

    #[test]
    fn test_late_poll_takes_one_sample_and_rearms_from_now() {
        let (mut collector, mut store, mut source, _) = make_parts();

        let late = collector.poll_at() + Duration::from_millis(500);
        let output = collector.poll(late, &mut store, &mut source);
        assert!(output.is_some());
        assert_eq!(collector.samples_taken(), 1);
        // No burst catch-up: the next tick is a half period after the
        // late wake-up.
        assert_eq!(collector.poll_at() - late, Duration::from_millis(100));
    }
}
