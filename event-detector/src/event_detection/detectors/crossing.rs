use super::{AcceptPolicy, Decay, Detector, EventKind, EventStore, Target, Threshold, Trace};

impl Detector {
    pub(super) fn scan_crossings<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        events: &mut EventStore,
        kind: EventKind,
        threshold: &mut Threshold,
        decay: Option<&Decay>,
        policy: &mut P,
    ) {
        if !self.in_range(trace) {
            return;
        }
        threshold.clamp();

        let dynamic = decay.is_some();
        if self.resume(trace, Some(&mut *events), threshold, false, dynamic, policy) {
            return;
        }

        let last = trace.last();
        while self.index + 1 < last {
            if let Some(decay) = decay {
                self.decay_threshold(trace, threshold, decay);
            }
            let index = self.index;
            let (current, next) = (trace.value(index), trace.value(index + 1));
            let crossed = match kind {
                EventKind::Falling => current >= threshold.value && next < threshold.value,
                _ => current <= threshold.value && next > threshold.value,
            };
            if crossed {
                self.index = index + 1;
                if dynamic {
                    self.previous_sample_time = trace.time(index + 1);
                }
                let target = Target {
                    store: &mut *events,
                    history: None,
                    dynamic,
                };
                let candidate = trace.sample(index + 1).candidate(kind);
                if self.decide(trace, candidate, target, threshold, policy) {
                    break;
                }
            }
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_detection::{AcceptEvent, Decision, Real, policy};

    fn square() -> (Vec<Real>, Vec<Real>) {
        // Pulses rising at 2, 7, 12 and falling at 4, 9, 14.
        (0..16)
            .map(|i| {
                let value = if i % 5 >= 2 && i % 5 < 4 { 1.0 } else { 0.0 };
                (value, i as Real)
            })
            .unzip()
    }

    #[test]
    fn rising_and_falling_crossings() {
        let (values, times) = square();
        let trace = Trace::new(&values, &times);
        let mut threshold = Threshold::new(0.5, 0.1, 0.9);

        let mut rising = EventStore::new();
        let mut detector = Detector::default();
        detector.init(&trace);
        detector.rising(&trace, &mut rising, &mut threshold, &mut AcceptEvent);
        assert_eq!(rising.collect_times(), vec![2.0, 7.0, 12.0]);

        let mut falling = EventStore::new();
        detector.init(&trace);
        detector.falling(&trace, &mut falling, &mut threshold, &mut AcceptEvent);
        assert_eq!(falling.collect_times(), vec![4.0, 9.0, 14.0]);
    }

    #[test]
    fn crossings_resume_across_chunks() {
        let (values, times) = square();
        let mut threshold = Threshold::new(0.5, 0.1, 0.9);
        let mut events = EventStore::new();
        let mut detector = Detector::default();
        detector.init(&Trace::new(&values, &times));
        let mut policy = policy::from_fn(|candidate, context| {
            if context.last() <= candidate.position + 1 {
                Decision::Defer
            } else {
                Decision::accept(candidate)
            }
        });
        for end in [3, 4, 8, 13, 16] {
            let trace = Trace::new(&values[..end], &times[..end]);
            detector.rising(&trace, &mut events, &mut threshold, &mut policy);
        }
        assert_eq!(events.collect_times(), vec![2.0, 7.0, 12.0]);
        assert!(detector.pending().is_none());
    }

    #[test]
    fn dynamic_crossing_lowers_the_threshold() {
        let values = [0.0, 0.0, 0.0, 0.0, 0.3, 0.0];
        let times = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let trace = Trace::new(&values, &times);
        let mut threshold = Threshold::new(1.0, 0.25, 2.0);
        let decay = Decay::new(0.0, 0.0);

        let mut events = EventStore::new();
        let mut detector = Detector::default();
        detector.init(&trace);
        detector.dynamic_rising(&trace, &mut events, &mut threshold, &decay, &mut AcceptEvent);
        assert_eq!(events.collect_times(), vec![4.0]);
        assert_eq!(threshold.value, 0.25);
    }
}
