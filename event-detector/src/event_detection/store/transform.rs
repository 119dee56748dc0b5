use super::{EventStore, MAX_INTERVAL, ObservationWindow, Real};
use crate::event_detection::Event;
use std::{iter::Peekable, ops::Range};

/// Merges two time-ordered event sequences, keeping `a` first on equal times.
pub(crate) fn merge_sorted(
    a: impl Iterator<Item = Event>,
    b: impl Iterator<Item = Event>,
) -> Vec<Event> {
    let (mut a, mut b) = (a.peekable(), b.peekable());
    let mut merged = Vec::with_capacity(a.size_hint().0 + b.size_hint().0);
    loop {
        let next = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) if y.time < x.time => b.next(),
            (Some(_), _) => a.next(),
            (None, _) => b.next(),
        };
        match next {
            Some(event) => merged.push(event),
            None => return merged,
        }
    }
}

/// Advances `events` past all times before `time`
/// and tells whether the next one lies before `until`.
fn has_event_in<I: Iterator<Item = Real>>(
    events: &mut Peekable<I>,
    time: Real,
    until: Real,
) -> bool {
    while events.next_if(|&t| t < time).is_some() {}
    events.peek().is_some_and(|&t| t < until)
}

fn running_mean(values: impl Iterator<Item = Real>) -> Real {
    values
        .enumerate()
        .fold(0.0, |mean, (k, value)| mean + (value - mean) / (k + 1) as Real)
}

impl EventStore {
    /// Indices of the events within `[t0, t1)`, empty if there are none.
    fn indices_within(&self, t0: Real, t1: Real) -> Range<usize> {
        let n = self.next(t0);
        n..self.next(t1).max(n)
    }

    /// Replaces the content of this store by a copy of `other`.
    pub fn assign(&mut self, other: &EventStore) {
        self.clone_from(other);
    }

    /// Replaces the content of this store by the events of `other` within `[t0, t1)`,
    /// their times taken relative to `tref`. The result is a linear store.
    pub fn assign_range(&mut self, other: &EventStore, t0: Real, t1: Real, tref: Real) {
        let indices = other.indices_within(t0, t1);
        let events: Vec<Event> = indices.filter_map(|k| other.get(k)).collect();

        *self = EventStore::with_capacity(events.len(), other.has_sizes(), other.has_widths())
            .with_ident(other.ident());
        self.mean_ratio = other.mean_ratio;
        for event in &events {
            let slot = self.cursor;
            self.write_slot(
                slot,
                event.time - tref,
                event.size.unwrap_or_default(),
                event.width.unwrap_or_default(),
            );
            self.cursor += 1;
        }
        self.adopt_means(other, &events);
        self.window = ObservationWindow::new(t0 - tref, t1 - t0, other.window.stepsize());
        self.signal_time = other.signal_time.map(|t| t - tref);
    }

    /// Appends the events of `other` within `[t0, t1)`, their times taken relative to `tref`.
    pub fn append_range(&mut self, other: &EventStore, t0: Real, t1: Real, tref: Real) {
        let events: Vec<Event> = other
            .indices_within(t0, t1)
            .filter_map(|k| other.get(k))
            .collect();
        if self.window.offset().is_none() {
            self.window = ObservationWindow::new(t0 - tref, 0.0, other.window.stepsize());
            self.ident = other.ident.clone();
        }
        if !self.cyclic {
            self.reserve(self.len() + events.len(), 0.0);
        }
        self.mean_ratio = other.mean_ratio;
        for event in &events {
            self.push(
                event.time - tref,
                event.size.unwrap_or_default(),
                event.width.unwrap_or_default(),
            );
        }
        self.adopt_means(other, &events);
        self.window.set_back(t1 - tref);
        self.signal_time = other.signal_time.map(|t| t - tref);
    }

    /// Sets the running means to the plain means over `events`,
    /// falling back to those of `other` for missing channels.
    fn adopt_means(&mut self, other: &EventStore, events: &[Event]) {
        self.mean_size = if self.has_sizes() {
            running_mean(events.iter().filter_map(|event| event.size))
        } else {
            other.mean_size
        };
        self.mean_width = if self.has_widths() {
            running_mean(events.iter().filter_map(|event| event.width))
        } else {
            other.mean_width
        };
        self.mean_interval = match (events.first(), events.last()) {
            (Some(first), Some(last)) if events.len() > 1 => {
                (last.time - first.time) / (events.len() - 1) as Real
            }
            _ => MAX_INTERVAL,
        };
        self.mean_quality = other.mean_quality;
    }

    /// A linear copy of the events within `[t0, t1)` with times relative to `tref`.
    pub fn copy_range(&self, t0: Real, t1: Real, tref: Real) -> EventStore {
        let indices = self.indices_within(t0, t1);
        let mut copy = EventStore::with_capacity(
            indices.len(),
            self.has_sizes(),
            self.has_widths(),
        );
        for event in indices.filter_map(|k| self.get(k)) {
            copy.push(
                event.time - tref,
                event.size.unwrap_or_default(),
                event.width.unwrap_or_default(),
            );
        }
        copy.window = ObservationWindow::new(t0 - tref, t1 - t0, self.window.stepsize());
        copy
    }

    /// The times of the events within `[t0, t1)` relative to `tref`.
    pub fn copy_times(&self, t0: Real, t1: Real, tref: Real) -> Vec<Real> {
        self.indices_within(t0, t1)
            .map(|k| self.time(k) - tref)
            .collect()
    }

    /// Window spanning the windows of both stores.
    fn union_window(&self, other: &EventStore) -> ObservationWindow {
        let mut window = ObservationWindow::default();
        window.set_stepsize(self.window.stepsize().min(other.window.stepsize()));
        for store in [self, other] {
            if let (Some(front), Some(back)) = (store.window.front(), store.window.back()) {
                window.include(front);
                window.include(back);
            }
        }
        window
    }

    /// All events of both stores merged into one linear store.
    pub fn sum(&self, other: &EventStore) -> EventStore {
        let merged = merge_sorted(self.iter(), other.iter());
        let mut all = EventStore::with_capacity(
            merged.len(),
            self.has_sizes() && other.has_sizes(),
            self.has_widths() && other.has_widths(),
        );
        for event in merged {
            all.push(
                event.time,
                event.size.unwrap_or_default(),
                event.width.unwrap_or_default(),
            );
        }
        all.window = self.union_window(other);
        all
    }

    /// Bins of width `bin` in which both stores have an event, as a store of bin starts.
    pub fn coincident(&self, other: &EventStore, bin: Real) -> EventStore {
        let window = self.union_window(other);
        let mut synchronous = EventStore::with_capacity(self.len().min(other.len()), false, false);
        if self.is_empty() || bin <= 0.0 {
            synchronous.window = window;
            return synchronous;
        }

        let fronts = [window.front(), self.front(), other.front()];
        let backs = [window.back(), self.back(), other.back()];
        let start = fronts.into_iter().flatten().reduce(Real::min).unwrap_or_default();
        let end = backs.into_iter().flatten().reduce(Real::max).unwrap_or_default();

        let (mut a, mut b) = (
            self.collect_times().into_iter().peekable(),
            other.collect_times().into_iter().peekable(),
        );
        let origin = (start / bin + 1e-6).floor() * bin;
        let mut t1 = origin;
        let mut i = 1;
        while t1 <= end {
            let t2 = origin + i as Real * bin;
            if has_event_in(&mut a, t1, t2) && has_event_in(&mut b, t1, t2) {
                synchronous.push_time(t1);
            }
            t1 = t2;
            i += 1;
        }
        synchronous.window = window;
        synchronous
    }
}
