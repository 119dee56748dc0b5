//! Resumable detectors for peaks, troughs and threshold crossings.
//!
//! Each detector operation scans the samples between the position the
//! previous call stopped at and the current end of the [Trace]. Calling it
//! again after the trace has grown continues the scan, so feeding a trace in
//! chunks yields the same events as a single call over the whole trace.

mod crossing;
mod decay;
mod extrema;
mod threshold_peak;

use super::{AcceptPolicy, Candidate, Decision, EventKind, EventStore, Real, ScanContext};
use extrema::ExtremaScan;
use strum::Display;
use tracing::{debug, trace};

pub use decay::Decay;

pub const DEFAULT_HISTORY_SIZE: usize = 1000;

/// Samples of a trace, `values[i]` taken at `times[i]`.
/// Scanning never goes back before `first`.
#[derive(Debug, Clone, Copy)]
pub struct Trace<'a> {
    values: &'a [Real],
    times: &'a [Real],
    first: usize,
}

impl<'a> Trace<'a> {
    pub fn new(values: &'a [Real], times: &'a [Real]) -> Self {
        Self::with_first(values, times, 0)
    }

    pub fn with_first(values: &'a [Real], times: &'a [Real], first: usize) -> Self {
        Self {
            values,
            times,
            first,
        }
    }

    pub fn values(&self) -> &'a [Real] {
        self.values
    }

    pub fn times(&self) -> &'a [Real] {
        self.times
    }

    pub fn first(&self) -> usize {
        self.first
    }

    /// One past the last sample that has both a value and a time.
    pub fn last(&self) -> usize {
        self.values.len().min(self.times.len())
    }

    fn value(&self, index: usize) -> Real {
        self.values[index]
    }

    fn time(&self, index: usize) -> Real {
        self.times[index]
    }

    fn sample(&self, position: usize) -> Sample {
        Sample {
            position,
            time: self.time(position),
            value: self.value(position),
        }
    }

    fn is_local_max(&self, index: usize) -> bool {
        self.value(index) > self.value(index - 1) && self.value(index) > self.value(index + 1)
    }

    fn is_local_min(&self, index: usize) -> bool {
        self.value(index) < self.value(index - 1) && self.value(index) < self.value(index + 1)
    }
}

/// Detection threshold together with the range accepted events may move it in.
/// `min` may exceed `max`, see [Threshold::clamp].
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub value: Real,
    pub min: Real,
    pub max: Real,
}

impl Threshold {
    pub fn new(value: Real, min: Real, max: Real) -> Self {
        Self { value, min, max }
    }

    /// Moves the value into `[min, max]`. If `min` exceeds `max`, values above
    /// `min` are set to `min` and values below `max` to `max`.
    pub fn clamp(&mut self) {
        if self.min < self.max {
            if self.value > self.max {
                self.value = self.max;
            } else if self.value < self.min {
                self.value = self.min;
            }
        } else if self.value > self.min {
            self.value = self.min;
        } else if self.value < self.max {
            self.value = self.max;
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Direction {
    #[default]
    Unknown,
    Rising,
    Falling,
}

impl Direction {
    fn opposite(self) -> Self {
        match self {
            Direction::Rising => Direction::Falling,
            Direction::Falling => Direction::Rising,
            Direction::Unknown => Direction::Unknown,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
struct Sample {
    position: usize,
    time: Real,
    value: Real,
}

impl Sample {
    fn candidate(&self, kind: EventKind) -> Candidate {
        Candidate {
            kind,
            position: self.position,
            time: self.time,
            value: self.value,
        }
    }
}

/// A deferred candidate and the size it is logged with in the history.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    candidate: Candidate,
    history_size: Real,
}

/// Where a decision on a candidate sends the event.
struct Target<'s> {
    store: &'s mut EventStore,
    /// Size logged in the good or bad history, if the history is kept.
    history: Option<Real>,
    dynamic: bool,
}

#[derive(Debug, Clone)]
pub struct Detector {
    direction: Direction,
    index: usize,
    min: Sample,
    max: Sample,
    pending: Option<Pending>,
    event_pending: bool,
    last_accepted: usize,
    previous_event_time: Real,
    previous_sample_time: Real,
    event_size: Real,
    good_events: EventStore,
    bad_events: EventStore,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

fn history_store(capacity: usize, ident: &str) -> EventStore {
    EventStore::cyclic(capacity, true, false).with_ident(ident)
}

impl Detector {
    /// A detector keeping the last `history_size` good and bad candidates.
    pub fn new(history_size: usize) -> Self {
        Self {
            direction: Direction::Unknown,
            index: 0,
            min: Sample::default(),
            max: Sample::default(),
            pending: None,
            event_pending: false,
            last_accepted: 0,
            previous_event_time: 0.0,
            previous_sample_time: 0.0,
            event_size: 0.0,
            good_events: history_store(history_size, "GoodEvents"),
            bad_events: history_store(history_size, "BadEvents"),
        }
    }

    /// Starts a new scan at the first sample of `trace`.
    pub fn init(&mut self, trace: &Trace) {
        let first = trace.first();
        let start = if first < trace.last() {
            trace.sample(first)
        } else {
            Sample {
                position: first,
                ..Default::default()
            }
        };
        self.direction = Direction::Unknown;
        self.index = first;
        self.min = start;
        self.max = start;
        self.pending = None;
        self.event_pending = false;
        self.last_accepted = first;
        self.previous_event_time = 0.0;
        self.previous_sample_time = start.time;
        self.event_size = 0.0;
        self.clear_history();
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The sample the next call continues at.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The candidate awaiting a decision, if the last call was deferred.
    pub fn pending(&self) -> Option<&Candidate> {
        self.pending.as_ref().map(|pending| &pending.candidate)
    }

    pub fn last_accepted(&self) -> usize {
        self.last_accepted
    }

    /// Accepted candidates of the `*_hist` operations with their amplitude.
    pub fn good_events(&self) -> &EventStore {
        &self.good_events
    }

    /// Rejected candidates and sub-threshold extrema of the `*_hist` operations.
    pub fn bad_events(&self) -> &EventStore {
        &self.bad_events
    }

    pub fn history_size(&self) -> usize {
        self.good_events.capacity()
    }

    /// Resizes the good and bad histories, discarding their content.
    pub fn set_history_size(&mut self, history_size: usize) {
        self.good_events = history_store(history_size, "GoodEvents");
        self.bad_events = history_store(history_size, "BadEvents");
    }

    pub fn clear_history(&mut self) {
        self.good_events.clear();
        self.bad_events.clear();
    }

    /// True if the scan position lies within the samples of `trace`.
    fn in_range(&self, trace: &Trace) -> bool {
        self.index >= trace.first() && self.index < trace.last()
    }

    /// Asks `policy` about `candidate` and applies the decision.
    /// Returns true if the candidate was deferred.
    fn decide<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        candidate: Candidate,
        target: Target<'_>,
        threshold: &mut Threshold,
        policy: &mut P,
    ) -> bool {
        let decision = {
            let mut context = ScanContext::new(
                *trace,
                self.index,
                self.last_accepted,
                target.store,
                threshold,
            );
            policy.evaluate(&candidate, &mut context)
        };
        match decision {
            Decision::Accept { time, size, width } => {
                trace!(kind = %candidate.kind, time, size, "Accepted");
                target.store.push(time, size, width);
                threshold.clamp();
                self.last_accepted = candidate.position;
                if target.dynamic {
                    self.previous_event_time = time;
                }
                if let Some(size) = target.history {
                    self.good_events.push(time, size, 0.0);
                }
                false
            }
            Decision::Reject => {
                trace!(kind = %candidate.kind, time = candidate.time, "Rejected");
                target.store.update_mean_quality(false);
                if let Some(size) = target.history {
                    self.bad_events.push(candidate.time, size, 0.0);
                }
                false
            }
            Decision::Defer => {
                debug!(kind = %candidate.kind, position = candidate.position, "Deferred");
                self.pending = Some(Pending {
                    candidate,
                    history_size: target.history.unwrap_or(self.event_size),
                });
                true
            }
        }
    }

    /// Decides on the candidate deferred by the previous call and moves on
    /// past the sample the scan stopped at. Returns true if it is deferred again.
    fn resume<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        store: Option<&mut EventStore>,
        threshold: &mut Threshold,
        history: bool,
        dynamic: bool,
        policy: &mut P,
    ) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        let deferred = match store {
            Some(store) if pending.candidate.position >= trace.first() => {
                let target = Target {
                    store,
                    history: history.then_some(pending.history_size),
                    dynamic,
                };
                self.decide(trace, pending.candidate, target, threshold, policy)
            }
            _ => {
                debug!(position = pending.candidate.position, "Dropped deferred candidate");
                false
            }
        };
        if !deferred {
            self.index += 1;
        }
        deferred
    }

    /// Detects peaks and troughs whose amplitude exceeds the threshold.
    pub fn peak_trough<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        peaks: &mut EventStore,
        troughs: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(Some(peaks), Some(troughs), None, false);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    /// Like [Detector::peak_trough], logging candidates in the good and bad histories.
    pub fn peak_trough_hist<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        peaks: &mut EventStore,
        troughs: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(Some(peaks), Some(troughs), None, true);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn peak<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        peaks: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(Some(peaks), None, None, false);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn peak_hist<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        peaks: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(Some(peaks), None, None, true);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn trough<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        troughs: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(None, Some(troughs), None, false);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn trough_hist<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        troughs: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(None, Some(troughs), None, true);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    /// Like [Detector::peak_trough], with the threshold decaying towards its
    /// minimum while no event is accepted.
    pub fn dynamic_peak_trough<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        peaks: &mut EventStore,
        troughs: &mut EventStore,
        threshold: &mut Threshold,
        decay: &Decay,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(Some(peaks), Some(troughs), Some(decay), false);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn dynamic_peak_trough_hist<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        peaks: &mut EventStore,
        troughs: &mut EventStore,
        threshold: &mut Threshold,
        decay: &Decay,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(Some(peaks), Some(troughs), Some(decay), true);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn dynamic_peak<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        peaks: &mut EventStore,
        threshold: &mut Threshold,
        decay: &Decay,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(Some(peaks), None, Some(decay), false);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn dynamic_peak_hist<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        peaks: &mut EventStore,
        threshold: &mut Threshold,
        decay: &Decay,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(Some(peaks), None, Some(decay), true);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn dynamic_trough<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        troughs: &mut EventStore,
        threshold: &mut Threshold,
        decay: &Decay,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(None, Some(troughs), Some(decay), false);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    pub fn dynamic_trough_hist<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        troughs: &mut EventStore,
        threshold: &mut Threshold,
        decay: &Decay,
        policy: &mut P,
    ) {
        let scan = ExtremaScan::new(None, Some(troughs), Some(decay), true);
        self.scan_extrema(trace, scan, threshold, policy);
    }

    /// Detects upward crossings of the threshold. The event sits on the
    /// first sample above the threshold.
    pub fn rising<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        events: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        self.scan_crossings(trace, events, EventKind::Rising, threshold, None, policy);
    }

    /// Detects downward crossings of the threshold.
    pub fn falling<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        events: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        self.scan_crossings(trace, events, EventKind::Falling, threshold, None, policy);
    }

    pub fn dynamic_rising<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        events: &mut EventStore,
        threshold: &mut Threshold,
        decay: &Decay,
        policy: &mut P,
    ) {
        self.scan_crossings(trace, events, EventKind::Rising, threshold, Some(decay), policy);
    }

    pub fn dynamic_falling<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        events: &mut EventStore,
        threshold: &mut Threshold,
        decay: &Decay,
        policy: &mut P,
    ) {
        self.scan_crossings(trace, events, EventKind::Falling, threshold, Some(decay), policy);
    }

    /// Detects the largest local maximum of each excursion above the threshold.
    pub fn threshold_peak_hist<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        events: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        self.scan_threshold_extrema(trace, events, EventKind::Peak, threshold, policy);
    }

    /// Detects the smallest local minimum of each excursion below the threshold.
    pub fn threshold_trough_hist<P: AcceptPolicy + ?Sized>(
        &mut self,
        trace: &Trace,
        events: &mut EventStore,
        threshold: &mut Threshold,
        policy: &mut P,
    ) {
        self.scan_threshold_extrema(trace, events, EventKind::Trough, threshold, policy);
    }
}
