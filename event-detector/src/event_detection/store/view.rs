use super::{EventStore, ObservationWindow, Real, search::Layout};
use crate::event_detection::Event;

/// Read-only view onto the buffers of an [EventStore].
///
/// The view copies the bookkeeping of the store when it is created and only
/// refreshes it on [EventStoreView::sync], so a reader sees a consistent
/// set of events no matter when the owner publishes new ones.
#[derive(Debug, Clone, Copy)]
pub struct EventStoreView<'a> {
    times: &'a [Real],
    sizes: Option<&'a [Real]>,
    widths: Option<&'a [Real]>,
    layout: Layout,
    cycles: usize,
    cyclic: bool,
    window: ObservationWindow,
    mean_size: Real,
    mean_width: Real,
    mean_interval: Real,
    mean_quality: Real,
}

impl<'a> EventStoreView<'a> {
    pub fn new(store: &'a EventStore) -> Self {
        Self {
            times: &store.times,
            sizes: store.sizes.as_deref(),
            widths: store.widths.as_deref(),
            layout: store.layout(),
            cycles: store.cycles,
            cyclic: store.cyclic,
            window: store.window,
            mean_size: store.mean_size,
            mean_width: store.mean_width,
            mean_interval: store.mean_interval,
            mean_quality: store.mean_quality,
        }
    }

    /// Takes a fresh snapshot of `store`.
    pub fn sync(&mut self, store: &'a EventStore) {
        *self = Self::new(store);
    }

    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= self.layout.oldest
    }

    pub fn oldest_valid_index(&self) -> usize {
        self.layout.oldest
    }

    pub fn is_valid_index(&self, index: usize) -> bool {
        index >= self.layout.oldest && index < self.len()
    }

    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn time(&self, index: usize) -> Real {
        debug_assert!(self.is_valid_index(index));
        self.times[self.layout.slot(index)]
    }

    pub fn get(&self, index: usize) -> Option<Event> {
        self.is_valid_index(index).then(|| {
            let slot = self.layout.slot(index);
            Event {
                time: self.times[slot],
                size: self.sizes.map(|sizes| sizes[slot]),
                width: self.widths.map(|widths| widths[slot]),
            }
        })
    }

    pub fn front(&self) -> Option<Real> {
        (!self.is_empty()).then(|| self.time(self.layout.oldest))
    }

    pub fn back(&self) -> Option<Real> {
        (!self.is_empty()).then(|| self.time(self.len() - 1))
    }

    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        (self.layout.oldest..self.len()).filter_map(|index| self.get(index))
    }

    pub fn next(&self, time: Real) -> usize {
        self.layout.next(self.times, time)
    }

    pub fn previous(&self, time: Real) -> Option<usize> {
        self.layout.previous(self.times, time)
    }

    /// Number of events within `[t0, t1)`.
    pub fn count(&self, t0: Real, t1: Real) -> usize {
        if t1 <= t0 {
            return 0;
        }
        self.next(t1).saturating_sub(self.next(t0))
    }

    pub fn rate(&self, t0: Real, t1: Real) -> Real {
        if t1 <= t0 {
            return 0.0;
        }
        self.count(t0, t1) as Real / (t1 - t0)
    }

    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    pub fn mean_size(&self) -> Real {
        self.mean_size
    }

    pub fn mean_width(&self) -> Real {
        self.mean_width
    }

    pub fn mean_interval(&self) -> Real {
        self.mean_interval
    }

    pub fn mean_rate(&self) -> Real {
        if self.mean_interval > 0.0 {
            1.0 / self.mean_interval
        } else {
            0.0
        }
    }

    pub fn mean_quality(&self) -> Real {
        self.mean_quality
    }
}

impl<'a> From<&'a EventStore> for EventStoreView<'a> {
    fn from(store: &'a EventStore) -> Self {
        Self::new(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_reads_the_snapshot() {
        let mut store = EventStore::cyclic(4, true, false);
        for i in 0..6 {
            store.push(i as Real, 10.0 + i as Real, 0.0);
        }
        let view = EventStoreView::new(&store);
        assert_eq!(view.len(), 6);
        assert_eq!(view.front(), Some(2.0));
        assert_eq!(view.back(), Some(5.0));
        assert_eq!(view.get(3).and_then(|event| event.size), Some(13.0));
        assert_eq!(view.next(3.5), store.next(3.5));
        assert_eq!(view.previous(3.5), store.previous(3.5));
        assert_eq!(view.count(2.5, 5.0), 2);
        assert_eq!(view.count(2.5, 5.5), store.count(2.5, 5.5));
        assert_eq!(view.mean_quality(), store.mean_quality());
        let times: Vec<Real> = view.iter().map(|event| event.time).collect();
        assert_eq!(times, store.collect_times());
    }

    #[test]
    fn sync_picks_up_new_events() {
        let mut store = EventStore::from_times(&[1.0, 2.0]);
        let len = EventStoreView::new(&store).len();
        store.push_time(3.0);
        let mut view = EventStoreView::from(&store);
        assert_eq!(len, 2);
        assert_eq!(view.len(), 3);
        view.sync(&store);
        assert_eq!(view.back(), Some(3.0));
    }
}
