use super::{
    AcceptPolicy, Decay, Detector, Direction, EventKind, EventStore, Sample, Target, Threshold,
    Trace,
};

/// The stores and options of one peak/trough scan.
pub(super) struct ExtremaScan<'s> {
    peaks: Option<&'s mut EventStore>,
    troughs: Option<&'s mut EventStore>,
    decay: Option<&'s Decay>,
    history: bool,
}

impl<'s> ExtremaScan<'s> {
    pub(super) fn new(
        peaks: Option<&'s mut EventStore>,
        troughs: Option<&'s mut EventStore>,
        decay: Option<&'s Decay>,
        history: bool,
    ) -> Self {
        Self {
            peaks,
            troughs,
            decay,
            history,
        }
    }

    fn store(&mut self, kind: EventKind) -> Option<&mut EventStore> {
        match kind {
            EventKind::Peak => self.peaks.as_deref_mut(),
            EventKind::Trough => self.troughs.as_deref_mut(),
            EventKind::Rising | EventKind::Falling => None,
        }
    }
}

impl Detector {
    /// Reports an extremum that lies at least one threshold away from the
    /// current sample. Returns true if the policy deferred it.
    fn report_extremum<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        scan: &mut ExtremaScan<'_>,
        kind: EventKind,
        extremum: Sample,
        threshold: &mut Threshold,
        policy: &mut P,
    ) -> bool {
        let size = match kind {
            EventKind::Peak => extremum.value - self.min.value,
            _ => self.max.value - extremum.value,
        };
        let history = scan.history;
        let dynamic = scan.decay.is_some();
        match scan.store(kind) {
            Some(store) => {
                if extremum.position < trace.first() {
                    return false;
                }
                self.event_size = size;
                let target = Target {
                    store,
                    history: history.then_some(size),
                    dynamic,
                };
                self.decide(trace, extremum.candidate(kind), target, threshold, policy)
            }
            None => {
                self.last_accepted = extremum.position;
                false
            }
        }
    }

    pub(super) fn scan_extrema<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        mut scan: ExtremaScan<'_>,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        if !self.in_range(trace) {
            return;
        }
        threshold.clamp();

        let history = scan.history;
        let dynamic = scan.decay.is_some();
        if let Some(kind) = self.pending.map(|pending| pending.candidate.kind) {
            let store = scan.store(kind);
            if self.resume(trace, store, threshold, history, dynamic, policy) {
                return;
            }
        }

        let first = trace.first();
        let last = trace.last();
        while self.index < last {
            if let Some(decay) = scan.decay {
                self.decay_threshold(trace, threshold, decay);
            }
            let index = self.index;
            let sample = trace.sample(index);
            let value = sample.value;

            match self.direction {
                Direction::Rising => {
                    if self.max.value < value {
                        self.max = sample;
                    } else if self.max.value >= value + threshold.value {
                        let peak = self.max;
                        let deferred = self.report_extremum(
                            trace,
                            &mut scan,
                            EventKind::Peak,
                            peak,
                            threshold,
                            policy,
                        );
                        self.min = sample;
                        self.direction = Direction::Falling;
                        if deferred {
                            break;
                        }
                    } else if history
                        && scan.troughs.is_some()
                        && index > first + 1
                        && trace.is_local_min(index - 1)
                    {
                        self.bad_events.push(
                            trace.time(index - 1),
                            trace.value(index - 1) - self.min.value,
                            0.0,
                        );
                    }
                }
                Direction::Falling => {
                    if value < self.min.value {
                        self.min = sample;
                    } else if value >= self.min.value + threshold.value {
                        let trough = self.min;
                        let deferred = self.report_extremum(
                            trace,
                            &mut scan,
                            EventKind::Trough,
                            trough,
                            threshold,
                            policy,
                        );
                        self.max = sample;
                        self.direction = Direction::Rising;
                        if deferred {
                            break;
                        }
                    } else if history
                        && scan.peaks.is_some()
                        && index > first + 1
                        && trace.is_local_max(index - 1)
                    {
                        self.bad_events.push(
                            trace.time(index - 1),
                            trace.value(index - 1) - self.min.value,
                            0.0,
                        );
                    }
                }
                Direction::Unknown => {
                    if self.max.value >= value + threshold.value {
                        self.direction = Direction::Falling;
                    } else if value >= self.min.value + threshold.value {
                        self.direction = Direction::Rising;
                    }
                    if self.max.value < value {
                        self.max = sample;
                    } else if value < self.min.value {
                        self.min = sample;
                    }
                }
            }
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_detection::{AcceptEvent, Candidate, Decision, Real, ScanContext, policy};
    use assert_approx_eq::assert_approx_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn sine(periods: usize, samples_per_period: usize) -> (Vec<Real>, Vec<Real>) {
        let dt = 1.0 / samples_per_period as Real;
        let times: Vec<Real> = (0..periods * samples_per_period)
            .map(|i| i as Real * dt)
            .collect();
        let values = times
            .iter()
            .map(|t| (std::f64::consts::TAU * t).sin())
            .collect();
        (values, times)
    }

    /// Defers every candidate until `lag` samples past it are available.
    fn lagging(lag: usize) -> impl FnMut(&Candidate, &mut ScanContext<'_>) -> Decision {
        move |candidate, context| {
            if context.last() < candidate.position + lag {
                Decision::Defer
            } else {
                Decision::accept(candidate)
            }
        }
    }

    #[test]
    fn one_peak_and_trough_per_period() {
        let (values, times) = sine(5, 100);
        let trace = Trace::new(&values, &times);
        let mut peaks = EventStore::new();
        let mut troughs = EventStore::new();
        let mut threshold = Threshold::new(0.5, 0.1, 10.0);

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.peak_trough(&trace, &mut peaks, &mut troughs, &mut threshold, &mut AcceptEvent);

        assert_eq!(peaks.len(), 5);
        assert_eq!(troughs.len(), 5);
        for (n, event) in peaks.iter().enumerate() {
            assert_approx_eq!(event.time, n as Real + 0.25, 1e-9);
        }
        for (n, event) in troughs.iter().enumerate() {
            assert_approx_eq!(event.time, n as Real + 0.75, 1e-9);
        }
        assert_eq!(detector.index(), trace.last());
        assert_eq!(detector.direction(), Direction::Rising);
    }

    #[test]
    fn peaks_only() {
        let (values, times) = sine(3, 100);
        let trace = Trace::new(&values, &times);
        let mut peaks = EventStore::new();
        let mut threshold = Threshold::new(0.5, 0.1, 10.0);

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.peak(&trace, &mut peaks, &mut threshold, &mut AcceptEvent);

        assert_eq!(peaks.len(), 3);
        for (n, event) in peaks.iter().enumerate() {
            assert_approx_eq!(event.time, n as Real + 0.25, 1e-9);
        }
        // The last trough is tracked without being stored.
        assert_eq!(detector.last_accepted(), 275);
    }

    #[test]
    fn small_wiggles_are_ignored() {
        let values: Vec<Real> = (0..200)
            .map(|i| 0.1 * (i as Real * 0.3).sin())
            .collect();
        let times: Vec<Real> = (0..200).map(|i| i as Real).collect();
        let trace = Trace::new(&values, &times);
        let mut peaks = EventStore::new();
        let mut troughs = EventStore::new();
        let mut threshold = Threshold::new(0.5, 0.1, 10.0);

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.peak_trough(&trace, &mut peaks, &mut troughs, &mut threshold, &mut AcceptEvent);
        assert!(peaks.is_empty());
        assert!(troughs.is_empty());
    }

    #[test]
    fn rejected_troughs_go_to_bad_events() {
        let (values, times) = sine(4, 40);
        let trace = Trace::new(&values, &times);
        let mut peaks = EventStore::new();
        let mut troughs = EventStore::new();
        let mut threshold = Threshold::new(0.5, 0.1, 10.0);
        let mut peaks_only = policy::from_fn(|candidate, _| match candidate.kind {
            EventKind::Peak => Decision::accept(candidate),
            _ => Decision::Reject,
        });

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.peak_trough_hist(&trace, &mut peaks, &mut troughs, &mut threshold, &mut peaks_only);

        assert_eq!(peaks.len(), 4);
        assert!(troughs.is_empty());
        assert!(peaks.mean_quality() > 0.0);
        assert_eq!(troughs.mean_quality(), 0.0);
        assert_eq!(detector.good_events().len(), 4);
        assert_eq!(detector.bad_events().len(), 4);
    }

    #[test]
    fn history_records_amplitudes() {
        let (values, times) = sine(3, 100);
        let trace = Trace::new(&values, &times);
        let mut peaks = EventStore::new();
        let mut troughs = EventStore::new();
        let mut threshold = Threshold::new(0.5, 0.1, 10.0);

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.peak_trough_hist(&trace, &mut peaks, &mut troughs, &mut threshold, &mut AcceptEvent);

        assert_eq!(detector.good_events().len(), peaks.len() + troughs.len());
        let sizes: Vec<Real> = detector
            .good_events()
            .iter()
            .filter_map(|event| event.size)
            .collect();
        assert_approx_eq!(sizes[0], 1.0, 1e-9);
        for size in &sizes[1..] {
            assert_approx_eq!(*size, 2.0, 1e-9);
        }
    }

    #[test]
    fn chunks_give_the_same_events() {
        let mut rng = StdRng::seed_from_u64(42);
        let (values, times): (Vec<Real>, Vec<Real>) = (0..2000)
            .map(|i| {
                let t = i as Real * 0.01;
                (t.sin() + 0.5 * (3.7 * t).sin() + rng.random_range(-0.1..0.1), t)
            })
            .unzip();
        let mut threshold = Threshold::new(0.4, 0.1, 10.0);

        let whole = Trace::new(&values, &times);
        let mut peaks = EventStore::new();
        let mut troughs = EventStore::new();
        let mut detector = Detector::default();
        detector.init(&whole);
        detector.peak_trough(&whole, &mut peaks, &mut troughs, &mut threshold, &mut lagging(5));
        assert!(peaks.len() > 10);

        let mut chunked_peaks = EventStore::new();
        let mut chunked_troughs = EventStore::new();
        let mut chunked = Detector::default();
        let mut policy = lagging(5);
        let mut end = 0;
        chunked.init(&whole);
        while end < values.len() {
            end = (end + rng.random_range(1..40)).min(values.len());
            let trace = Trace::new(&values[..end], &times[..end]);
            chunked.peak_trough(
                &trace,
                &mut chunked_peaks,
                &mut chunked_troughs,
                &mut threshold,
                &mut policy,
            );
        }

        assert_eq!(chunked_peaks.collect_times(), peaks.collect_times());
        assert_eq!(chunked_troughs.collect_times(), troughs.collect_times());
    }

    #[test]
    fn dynamic_threshold_decays() {
        let times: Vec<Real> = (0..=100).map(|i| i as Real * 0.001).collect();
        let values = vec![0.0; times.len()];
        let trace = Trace::new(&values, &times);
        let mut peaks = EventStore::new();
        let mut threshold = Threshold::new(1.0, 0.0, 2.0);
        let decay = Decay::new(0.0, 0.1);

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.dynamic_peak(&trace, &mut peaks, &mut threshold, &decay, &mut AcceptEvent);

        assert!(peaks.is_empty());
        assert_approx_eq!(threshold.value, Real::exp(-1.0), 5e-3);
    }

    #[test]
    fn dynamic_threshold_waits_for_the_delay() {
        let times: Vec<Real> = (0..=300).map(|i| i as Real * 0.001).collect();
        let values = vec![0.0; times.len()];
        let mut peaks = EventStore::new();
        let mut threshold = Threshold::new(1.0, 0.0, 2.0);
        let decay = Decay::new(0.1, 0.1);

        let trace = Trace::new(&values, &times);
        let head = Trace::new(&values[..51], &times[..51]);
        let mut detector = Detector::default();
        detector.init(&trace);
        detector.dynamic_peak(&head, &mut peaks, &mut threshold, &decay, &mut AcceptEvent);
        assert_eq!(threshold.value, 1.0);

        detector.dynamic_peak(&trace, &mut peaks, &mut threshold, &decay, &mut AcceptEvent);
        assert!(peaks.is_empty());
        assert_approx_eq!(threshold.value, Real::exp(-2.0), 1e-2);
    }

    #[test]
    fn out_of_range_is_a_no_op() {
        let (values, times) = sine(1, 20);
        let trace = Trace::new(&values, &times);
        let mut peaks = EventStore::new();
        let mut threshold = Threshold::new(5.0, 0.1, 1.0);

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.peak(&trace, &mut peaks, &mut threshold, &mut AcceptEvent);
        assert_eq!(detector.index(), trace.last());
        assert_eq!(threshold.value, 1.0);

        threshold.value = 5.0;
        detector.peak(&trace, &mut peaks, &mut threshold, &mut AcceptEvent);
        assert_eq!(threshold.value, 5.0);
    }
}
