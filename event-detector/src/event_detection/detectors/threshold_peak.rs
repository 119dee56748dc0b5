use super::{
    AcceptPolicy, Detector, Direction, EventKind, EventStore, Real, Sample, Target, Threshold,
    Trace,
};

impl Detector {
    fn extremum_mut(&mut self, kind: EventKind) -> &mut Sample {
        match kind {
            EventKind::Trough => &mut self.min,
            _ => &mut self.max,
        }
    }

    /// Scans for excursions beyond the threshold and reports the most extreme
    /// turning point of each once the trace returns. `kind` is either
    /// [EventKind::Peak] or [EventKind::Trough]; the latter mirrors the former.
    pub(super) fn scan_threshold_extrema<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        events: &mut EventStore,
        kind: EventKind,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        if !self.in_range(trace) {
            return;
        }
        threshold.clamp();

        if self.resume(trace, Some(&mut *events), threshold, true, false, policy) {
            return;
        }

        let (sign, toward): (Real, _) = match kind {
            EventKind::Trough => (-1.0, Direction::Falling),
            _ => (1.0, Direction::Rising),
        };
        let away = toward.opposite();
        let first = trace.first();
        let last = trace.last();
        while self.index + 1 < last {
            let index = self.index;
            let current = sign * trace.value(index);
            let next = sign * trace.value(index + 1);

            if self.direction == toward {
                if next < current {
                    self.direction = away;
                    if current > sign * threshold.value {
                        let extremum = *self.extremum_mut(kind);
                        if !self.event_pending
                            || extremum.position < first
                            || current > sign * extremum.value
                        {
                            *self.extremum_mut(kind) = trace.sample(index);
                            self.event_pending = true;
                        }
                    } else {
                        self.bad_events
                            .push(trace.time(index), trace.value(index), 0.0);
                    }
                }
            } else if self.direction == away {
                if self.event_pending && current <= sign * threshold.value {
                    self.event_pending = false;
                    let extremum = *self.extremum_mut(kind);
                    if extremum.position >= first {
                        let target = Target {
                            store: &mut *events,
                            history: Some(extremum.value),
                            dynamic: false,
                        };
                        let candidate = extremum.candidate(kind);
                        if self.decide(trace, candidate, target, threshold, policy) {
                            if next > current {
                                self.direction = toward;
                            }
                            break;
                        }
                    }
                }
                if next > current {
                    self.direction = toward;
                }
            } else if next > current {
                self.direction = toward;
            } else if next < current {
                self.direction = away;
            }
            self.index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_detection::AcceptEvent;

    const VALUES: [Real; 13] = [0.0, 1.0, 3.0, 1.0, 2.0, 5.0, 2.0, 4.0, 0.0, 0.5, 0.0, 4.0, 0.0];

    fn times() -> Vec<Real> {
        (0..VALUES.len()).map(|i| i as Real).collect()
    }

    fn sizes(store: &EventStore) -> Vec<Real> {
        store.iter().filter_map(|event| event.size).collect()
    }

    #[test]
    fn largest_peak_of_each_excursion() {
        let times = times();
        let trace = Trace::new(&VALUES, &times);
        let mut threshold = Threshold::new(1.5, 0.5, 10.0);
        let mut events = EventStore::new();

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.threshold_peak_hist(&trace, &mut events, &mut threshold, &mut AcceptEvent);

        assert_eq!(events.collect_times(), vec![2.0, 5.0]);
        assert_eq!(sizes(detector.good_events()), vec![3.0, 5.0]);
        assert_eq!(detector.bad_events().collect_times(), vec![9.0]);
        assert_eq!(sizes(detector.bad_events()), vec![0.5]);
        assert_eq!(detector.direction(), Direction::Falling);
    }

    #[test]
    fn troughs_mirror_peaks() {
        let values: Vec<Real> = VALUES.iter().map(|v| -v).collect();
        let times = times();
        let trace = Trace::new(&values, &times);
        let mut threshold = Threshold::new(-1.5, -10.0, -0.5);
        let mut events = EventStore::new();

        let mut detector = Detector::default();
        detector.init(&trace);
        detector.threshold_trough_hist(&trace, &mut events, &mut threshold, &mut AcceptEvent);

        assert_eq!(events.collect_times(), vec![2.0, 5.0]);
        assert_eq!(sizes(detector.good_events()), vec![-3.0, -5.0]);
        assert_eq!(sizes(detector.bad_events()), vec![-0.5]);
        assert_eq!(detector.direction(), Direction::Rising);
    }

    #[test]
    fn excursions_span_chunks() {
        let times = times();
        let mut threshold = Threshold::new(1.5, 0.5, 10.0);
        let mut events = EventStore::new();

        let mut detector = Detector::default();
        detector.init(&Trace::new(&VALUES, &times));
        for end in [4, 7, 9, 13] {
            let trace = Trace::new(&VALUES[..end], &times[..end]);
            detector.threshold_peak_hist(&trace, &mut events, &mut threshold, &mut AcceptEvent);
        }
        assert_eq!(events.collect_times(), vec![2.0, 5.0]);
        assert_eq!(detector.index(), VALUES.len() - 1);
    }
}
