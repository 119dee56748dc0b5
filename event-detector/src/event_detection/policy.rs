//! Decisions on candidate events.
//!
//! Whenever a [Detector](super::Detector) finds a candidate it asks an
//! [AcceptPolicy] whether to store it, drop it, or wait for more samples.
//! Any closure `FnMut(&Candidate, &mut ScanContext) -> Decision` is a policy.

use super::{EventStore, Real, Threshold, Trace};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EventKind {
    Peak,
    Trough,
    Rising,
    Falling,
}

/// An event found by a detector, awaiting a decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub kind: EventKind,
    /// Index of the sample the event sits on.
    pub position: usize,
    pub time: Real,
    pub value: Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Store an event with the given properties.
    Accept { time: Real, size: Real, width: Real },
    /// Drop the candidate. Counts against the mean quality of the target store.
    Reject,
    /// Stop scanning and ask again once more samples are available.
    Defer,
}

impl Decision {
    /// Accepts the candidate as it is, its value becoming the event size.
    pub fn accept(candidate: &Candidate) -> Self {
        Decision::Accept {
            time: candidate.time,
            size: candidate.value,
            width: 0.0,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Decision::Defer)
    }
}

/// What a policy may inspect, or modify, while judging a candidate.
#[derive(Debug)]
pub struct ScanContext<'a> {
    trace: Trace<'a>,
    index: usize,
    last_accepted: usize,
    store: &'a EventStore,
    threshold: &'a mut Threshold,
}

impl<'a> ScanContext<'a> {
    pub(crate) fn new(
        trace: Trace<'a>,
        index: usize,
        last_accepted: usize,
        store: &'a EventStore,
        threshold: &'a mut Threshold,
    ) -> Self {
        Self {
            trace,
            index,
            last_accepted,
            store,
            threshold,
        }
    }

    pub fn values(&self) -> &'a [Real] {
        self.trace.values()
    }

    pub fn times(&self) -> &'a [Real] {
        self.trace.times()
    }

    pub fn first(&self) -> usize {
        self.trace.first()
    }

    /// One past the last available sample.
    pub fn last(&self) -> usize {
        self.trace.last()
    }

    /// The sample the scan has reached.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn index_time(&self) -> Option<Real> {
        self.times().get(self.index).copied()
    }

    /// Position of the last accepted event, or of the opposite extremum
    /// for detectors that only store one kind.
    pub fn last_accepted(&self) -> usize {
        self.last_accepted
    }

    pub fn last_accepted_time(&self) -> Option<Real> {
        self.times().get(self.last_accepted).copied()
    }

    /// The store accepted events go to.
    pub fn store(&self) -> &EventStore {
        self.store
    }

    pub fn threshold(&self) -> &Threshold {
        &*self.threshold
    }

    pub fn threshold_mut(&mut self) -> &mut Threshold {
        &mut *self.threshold
    }
}

pub trait AcceptPolicy {
    fn evaluate(&mut self, candidate: &Candidate, context: &mut ScanContext<'_>) -> Decision;
}

/// Accepts every candidate.
#[derive(Default, Debug, Clone, Copy)]
pub struct AcceptEvent;

impl AcceptPolicy for AcceptEvent {
    fn evaluate(&mut self, candidate: &Candidate, _context: &mut ScanContext<'_>) -> Decision {
        Decision::accept(candidate)
    }
}

impl<F> AcceptPolicy for F
where
    F: FnMut(&Candidate, &mut ScanContext<'_>) -> Decision,
{
    fn evaluate(&mut self, candidate: &Candidate, context: &mut ScanContext<'_>) -> Decision {
        self(candidate, context)
    }
}

/// Pins the signature of a closure so that it can be used as a policy.
pub fn from_fn<F>(f: F) -> F
where
    F: FnMut(&Candidate, &mut ScanContext<'_>) -> Decision,
{
    f
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            kind: EventKind::Peak,
            position: 2,
            time: 0.2,
            value: 3.0,
        }
    }

    #[test]
    fn accept_event_takes_the_candidate() {
        let (values, times) = ([1.0, 2.0, 3.0], [0.0, 0.1, 0.2]);
        let store = EventStore::new();
        let mut threshold = Threshold::new(1.0, 0.5, 2.0);
        let mut context =
            ScanContext::new(Trace::new(&values, &times), 2, 0, &store, &mut threshold);
        assert_eq!(
            AcceptEvent.evaluate(&candidate(), &mut context),
            Decision::Accept {
                time: 0.2,
                size: 3.0,
                width: 0.0
            }
        );
        assert_eq!(context.index_time(), Some(0.2));
        assert_eq!(context.last_accepted_time(), Some(0.0));
    }

    #[test]
    fn closures_are_policies() {
        let (values, times) = ([1.0, 2.0, 3.0], [0.0, 0.1, 0.2]);
        let store = EventStore::new();
        let mut threshold = Threshold::new(1.0, 0.5, 2.0);
        let mut calls = 0;
        let mut policy = from_fn(|candidate, context| {
            calls += 1;
            context.threshold_mut().value = candidate.value;
            Decision::Reject
        });
        {
            let mut context =
                ScanContext::new(Trace::new(&values, &times), 2, 0, &store, &mut threshold);
            assert_eq!(policy.evaluate(&candidate(), &mut context), Decision::Reject);
        }
        assert_eq!(calls, 1);
        assert_eq!(threshold.value, 3.0);
        assert_eq!(EventKind::Trough.to_string(), "Trough");
    }
}
