use super::{EventStore, Real};
use std::ops::Range;

/// Where the accessible events of a store sit in its time buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Layout {
    pub(super) cursor: usize,
    pub(super) base_index: usize,
    pub(super) capacity: usize,
    pub(super) oldest: usize,
}

impl Layout {
    pub(super) fn len(&self) -> usize {
        self.base_index + self.cursor
    }

    pub(super) fn slot(&self, index: usize) -> usize {
        if index >= self.base_index {
            index - self.base_index
        } else {
            index + self.capacity - self.base_index
        }
    }

    /// Buffer slots holding the accessible events.
    /// The first range covers the current cycle, the second the part of the
    /// previous cycle that has not been overwritten yet. Times increase from the
    /// second range into the first.
    fn regions(&self) -> (Range<usize>, Range<usize>) {
        if self.oldest >= self.base_index {
            (self.oldest - self.base_index..self.cursor, 0..0)
        } else {
            (0..self.cursor, self.slot(self.oldest)..self.capacity)
        }
    }

    pub(super) fn next(&self, times: &[Real], time: Real) -> usize {
        let (current, previous) = self.regions();
        if previous
            .clone()
            .next_back()
            .is_some_and(|slot| times[slot] >= time)
        {
            let slot = previous.start + times[previous.clone()].partition_point(|&t| t < time);
            return self.base_index + slot - self.capacity;
        }
        let slot = current.start + times[current.clone()].partition_point(|&t| t < time);
        if slot < current.end {
            self.base_index + slot
        } else {
            self.len()
        }
    }

    pub(super) fn previous(&self, times: &[Real], time: Real) -> Option<usize> {
        let (current, previous) = self.regions();
        let in_current = previous.is_empty()
            || current
                .clone()
                .next()
                .is_some_and(|slot| times[slot] <= time);
        if in_current {
            let count = times[current.clone()].partition_point(|&t| t <= time);
            (count > 0).then(|| self.base_index + current.start + count - 1)
        } else {
            let count = times[previous.clone()].partition_point(|&t| t <= time);
            (count > 0).then(|| self.base_index + previous.start + count - 1 - self.capacity)
        }
    }
}

impl EventStore {
    pub(super) fn layout(&self) -> Layout {
        Layout {
            cursor: self.cursor,
            base_index: self.base_index,
            capacity: self.capacity(),
            oldest: self.oldest_valid_index(),
        }
    }

    /// Index of the first event at or after `time`, or `len()` if there is none.
    pub fn next(&self, time: Real) -> usize {
        self.layout().next(&self.times, time)
    }

    /// Index of the last event at or before `time`, or `None` if there is none.
    pub fn previous(&self, time: Real) -> Option<usize> {
        self.layout().previous(&self.times, time)
    }

    /// Time of the first event at or after `time`.
    pub fn next_time(&self, time: Real) -> Option<Real> {
        let index = self.next(time);
        (index < self.len()).then(|| self.time(index))
    }

    /// Time of the last event at or before `time`.
    pub fn previous_time(&self, time: Real) -> Option<Real> {
        self.previous(time).map(|index| self.time(index))
    }

    /// True if an event lies closer than `distance` to `time`.
    pub fn within(&self, time: Real, distance: Real) -> bool {
        let next = self.next(time);
        if next < self.len() && self.time(next) - time < distance {
            return true;
        }
        self.previous(time)
            .is_some_and(|previous| time - self.time(previous) < distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn brute_next(store: &EventStore, time: Real) -> usize {
        (store.oldest_valid_index()..store.len())
            .find(|&i| store.time(i) >= time)
            .unwrap_or(store.len())
    }

    fn brute_previous(store: &EventStore, time: Real) -> Option<usize> {
        (store.oldest_valid_index()..store.len())
            .rev()
            .find(|&i| store.time(i) <= time)
    }

    fn random_times(rng: &mut StdRng, n: usize) -> Vec<Real> {
        let mut time = 0.0;
        (0..n)
            .map(|_| {
                time += rng.random_range(0.01..1.0);
                time
            })
            .collect()
    }

    fn assert_search_matches(store: &EventStore, rng: &mut StdRng) {
        let back = store.back().unwrap_or_default();
        let mut queries: Vec<Real> = (0..200).map(|_| rng.random_range(-1.0..back + 1.0)).collect();
        queries.extend(store.collect_times());
        for time in queries {
            assert_eq!(store.next(time), brute_next(store, time), "next({time})");
            assert_eq!(
                store.previous(time),
                brute_previous(store, time),
                "previous({time})"
            );
        }
    }

    #[test]
    fn linear_search_matches_scan() {
        let mut rng = StdRng::seed_from_u64(7);
        let store = EventStore::from_times(&random_times(&mut rng, 100));
        assert_search_matches(&store, &mut rng);
    }

    #[test]
    fn cyclic_search_matches_scan() {
        let mut rng = StdRng::seed_from_u64(11);
        let times = random_times(&mut rng, 137);
        let mut store = EventStore::cyclic(32, false, false);
        for (pushed, &time) in times.iter().enumerate() {
            store.push_time(time);
            if pushed % 9 == 0 {
                assert_search_matches(&store, &mut rng);
            }
        }
        assert_eq!(store.oldest_valid_index(), 137 - 32);
        assert_search_matches(&store, &mut rng);
    }

    #[test]
    fn write_window_hides_slots_ahead_of_the_cursor() {
        let mut store = EventStore::cyclic(10, false, false);
        for i in 0..15 {
            store.push_time(i as Real);
        }
        store.set_write_window(2);
        assert_eq!(store.oldest_valid_index(), 7);
        assert_eq!(store.next(0.0), 7);
        assert_eq!(store.previous(6.5), None);
        assert_eq!(store.previous(8.5), Some(8));
        assert_eq!(store.front(), Some(7.0));
    }

    #[test]
    fn sentinels_on_empty_store() {
        let store = EventStore::new();
        assert_eq!(store.next(1.0), 0);
        assert_eq!(store.previous(1.0), None);
        assert_eq!(store.next_time(1.0), None);
        assert!(!store.within(1.0, 10.0));
    }

    #[test]
    fn neighbours_and_within() {
        let store = EventStore::from_times(&[1.0, 2.0, 4.0]);
        assert_eq!(store.next(2.0), 1);
        assert_eq!(store.previous(2.0), Some(1));
        assert_eq!(store.next(4.5), 3);
        assert_eq!(store.previous(0.5), None);
        assert_eq!(store.next_time(2.5), Some(4.0));
        assert_eq!(store.previous_time(2.5), Some(2.0));
        assert!(store.within(3.5, 0.6));
        assert!(!store.within(3.0, 0.9));
    }
}
