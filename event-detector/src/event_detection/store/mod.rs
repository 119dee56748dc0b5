//! Time-ordered storage for detected events.
//!
//! An [EventStore] keeps event times, and optionally event sizes and widths,
//! in parallel buffers. A linear store grows on demand. A cyclic store keeps
//! a fixed number of slots and overwrites its oldest events once full; the
//! index of an event keeps counting up across cycles, so indices below
//! [EventStore::oldest_valid_index] are no longer accessible.
//!
//! Every push updates exponentially smoothed means of the event size, width,
//! interval and detection quality.

mod export;
mod rate;
mod search;
mod statistics;
mod transform;
mod view;

pub use export::{NumberFormat, Notation};
pub use view::EventStoreView;

use super::{Event, Real};
use std::{
    fmt::Display,
    ops::{AddAssign, DivAssign, Index, MulAssign, SubAssign},
};
use thiserror::Error;
use tracing::{debug, warn};

/// Interval reported while fewer than two events are known.
pub const MAX_INTERVAL: Real = 1.0e12;
pub const DEFAULT_MEAN_RATIO: Real = 0.03;
pub const DEFAULT_STEPSIZE: Real = 0.0001;

const MIN_MEAN_RATIO: Real = 1.0e-8;
const MIN_GROWTH: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("cursor {cursor} > capacity {capacity}")]
    CursorBeyondCapacity { cursor: usize, capacity: usize },
    #[error("{channel} buffer holds {len} slots but capacity is {capacity}")]
    ChannelLength {
        channel: &'static str,
        len: usize,
        capacity: usize,
    },
}

/// The time range a store describes, which may extend beyond its events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationWindow {
    offset: Option<Real>,
    length: Real,
    stepsize: Real,
}

impl Default for ObservationWindow {
    fn default() -> Self {
        Self {
            offset: None,
            length: 0.0,
            stepsize: DEFAULT_STEPSIZE,
        }
    }
}

impl ObservationWindow {
    pub fn new(offset: Real, length: Real, stepsize: Real) -> Self {
        Self {
            offset: Some(offset),
            length,
            stepsize,
        }
    }

    /// `None` until the first event arrives or an offset is set.
    pub fn offset(&self) -> Option<Real> {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Real) {
        self.offset = Some(offset);
    }

    pub fn length(&self) -> Real {
        self.length
    }

    pub fn set_length(&mut self, length: Real) {
        self.length = length;
    }

    pub fn stepsize(&self) -> Real {
        self.stepsize
    }

    pub fn set_stepsize(&mut self, stepsize: Real) {
        self.stepsize = stepsize;
    }

    pub fn front(&self) -> Option<Real> {
        self.offset
    }

    pub fn back(&self) -> Option<Real> {
        self.offset.map(|offset| offset + self.length)
    }

    /// Moves the front, keeping the back in place.
    pub fn set_front(&mut self, front: Real) {
        if let Some(offset) = self.offset {
            self.length += offset - front;
        }
        self.offset = Some(front);
    }

    /// Moves the back, keeping the front in place.
    pub fn set_back(&mut self, back: Real) {
        match self.offset {
            Some(offset) => self.length = back - offset,
            None => {
                self.offset = Some(back);
                self.length = 0.0;
            }
        }
    }

    /// Widens the window so that it contains `time`.
    pub fn include(&mut self, time: Real) {
        match self.offset {
            None => {
                self.offset = Some(time);
                self.length = 0.0;
            }
            Some(offset) if time < offset => self.set_front(time),
            Some(offset) if time > offset + self.length => self.length = time - offset,
            Some(_) => {}
        }
    }

    pub(crate) fn shift(&mut self, x: Real) {
        self.offset = self.offset.map(|offset| offset + x);
    }

    pub(crate) fn scale(&mut self, x: Real) {
        self.offset = self.offset.map(|offset| offset * x);
        self.length *= x;
        self.stepsize *= x;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventStore {
    times: Vec<Real>,
    sizes: Option<Vec<Real>>,
    widths: Option<Vec<Real>>,
    cyclic: bool,
    /// Write position within the current cycle.
    cursor: usize,
    /// Number of events retired by completed cycles.
    base_index: usize,
    cycles: usize,
    /// Indices below this lost their slot to a reallocation or a pop.
    retired: usize,
    write_window: usize,
    window: ObservationWindow,
    mean_ratio: Real,
    mean_size: Real,
    mean_width: Real,
    mean_interval: Real,
    mean_quality: Real,
    ident: String,
    signal_time: Option<Real>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            sizes: None,
            widths: None,
            cyclic: false,
            cursor: 0,
            base_index: 0,
            cycles: 0,
            retired: 0,
            write_window: 0,
            window: ObservationWindow::default(),
            mean_ratio: DEFAULT_MEAN_RATIO,
            mean_size: 0.0,
            mean_width: 0.0,
            mean_interval: MAX_INTERVAL,
            mean_quality: 0.0,
            ident: String::new(),
            signal_time: None,
        }
    }
}

impl EventStore {
    /// An empty linear store with neither size nor width channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// A linear store with `capacity` preallocated slots.
    pub fn with_capacity(capacity: usize, sizes: bool, widths: bool) -> Self {
        Self {
            times: vec![0.0; capacity],
            sizes: sizes.then(|| vec![0.0; capacity]),
            widths: widths.then(|| vec![0.0; capacity]),
            ..Default::default()
        }
    }

    /// A ring buffer holding at most `capacity` events.
    pub fn cyclic(capacity: usize, sizes: bool, widths: bool) -> Self {
        Self {
            cyclic: true,
            ..Self::with_capacity(capacity, sizes, widths)
        }
    }

    /// Builds a linear store from event times.
    pub fn from_times(times: &[Real]) -> Self {
        let mut store = Self::with_capacity(times.len(), false, false);
        store.push_all(times, 0.0, 0.0);
        store
    }

    pub fn with_ident(mut self, ident: &str) -> Self {
        self.ident = ident.to_owned();
        self
    }

    /// Total number of events pushed, including those overwritten by later cycles.
    pub fn len(&self) -> usize {
        self.base_index + self.cursor
    }

    /// True if no event is accessible.
    pub fn is_empty(&self) -> bool {
        self.len() <= self.oldest_valid_index()
    }

    pub fn capacity(&self) -> usize {
        self.times.len()
    }

    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    pub fn set_cyclic(&mut self, cyclic: bool) {
        self.cyclic = cyclic;
    }

    pub fn has_sizes(&self) -> bool {
        self.sizes.is_some()
    }

    pub fn has_widths(&self) -> bool {
        self.widths.is_some()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn base_index(&self) -> usize {
        self.base_index
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn write_window(&self) -> usize {
        self.write_window
    }

    /// Number of slots ahead of the cursor that are being written by a producer
    /// and must not be read.
    pub fn set_write_window(&mut self, write_window: usize) {
        self.write_window = write_window;
    }

    /// The smallest index that can still be read.
    pub fn oldest_valid_index(&self) -> usize {
        self.oldest_index_with(self.write_window)
    }

    /// The smallest index whose slot still holds its event, ignoring the write window.
    fn first_stored_index(&self) -> usize {
        self.oldest_index_with(0)
    }

    fn oldest_index_with(&self, write_window: usize) -> usize {
        if !self.cyclic {
            return 0;
        }
        (self.base_index + self.cursor + write_window)
            .saturating_sub(self.capacity())
            .max(self.retired)
            .min(self.len())
    }

    pub fn is_valid_index(&self, index: usize) -> bool {
        index >= self.oldest_valid_index() && index < self.len()
    }

    /// Buffer slot of an accessible index.
    fn slot(&self, index: usize) -> usize {
        if index >= self.base_index {
            index - self.base_index
        } else {
            index + self.capacity() - self.base_index
        }
    }

    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut ObservationWindow {
        &mut self.window
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn set_ident(&mut self, ident: &str) {
        self.ident = ident.to_owned();
    }

    pub fn signal_time(&self) -> Option<Real> {
        self.signal_time
    }

    pub fn set_signal_time(&mut self, signal_time: Option<Real>) {
        self.signal_time = signal_time;
    }

    /// Ensures at least `capacity` slots, keeping every accessible event.
    /// Fresh time slots are filled with `default`.
    pub fn reserve(&mut self, capacity: usize, default: Real) {
        if capacity > self.capacity() {
            self.reallocate(capacity, default);
        }
    }

    /// Reallocates the buffers to exactly `capacity` slots.
    /// When shrinking, the newest events that no longer fit are dropped.
    pub fn free(&mut self, capacity: usize, default: Real) {
        if capacity != self.capacity() {
            self.reallocate(capacity, default);
        }
    }

    /// Sets the number of events of a linear store to `len`,
    /// padding new slots with `default` and resetting the running means.
    pub fn resize(&mut self, len: usize, default: Real) {
        if len == 0 {
            self.clear();
            return;
        }
        if self.cyclic {
            debug!(ident = self.ident.as_str(), "resize() has no effect on cyclic stores");
            return;
        }
        self.reserve(len, default);
        if len > self.cursor {
            let cursor = self.cursor;
            self.times[cursor..len].fill(default);
            for channel in [self.sizes.as_mut(), self.widths.as_mut()]
                .into_iter()
                .flatten()
            {
                channel[cursor..len].fill(0.0);
            }
        }
        self.cursor = len;
        self.reset_means();
    }

    /// Removes all events, keeping the allocated buffers.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.base_index = 0;
        self.cycles = 0;
        self.retired = 0;
        self.reset_means();
    }

    fn reset_means(&mut self) {
        self.mean_size = 0.0;
        self.mean_width = 0.0;
        self.mean_interval = MAX_INTERVAL;
        self.mean_quality = 0.0;
    }

    /// Copies the stored events oldest first into fresh buffers of `capacity` slots.
    fn reallocate(&mut self, capacity: usize, default: Real) {
        let first = self.first_stored_index();
        let kept = (self.len() - first).min(capacity);
        let slots: Vec<usize> = (first..first + kept).map(|i| self.slot(i)).collect();
        let relayout = |buffer: &[Real], fill: Real| {
            let mut fresh: Vec<Real> = slots.iter().map(|&slot| buffer[slot]).collect();
            fresh.resize(capacity, fill);
            fresh
        };
        self.times = relayout(&self.times, default);
        self.sizes = self.sizes.as_deref().map(|sizes| relayout(sizes, 0.0));
        self.widths = self.widths.as_deref().map(|widths| relayout(widths, 0.0));
        self.base_index = first;
        self.retired = first;
        self.cursor = kept;
    }

    fn grow(&mut self) {
        let capacity = self.capacity();
        let grown = if capacity >= MIN_GROWTH {
            3 * capacity / 2
        } else {
            MIN_GROWTH
        };
        self.reallocate(grown, 0.0);
    }

    fn write_slot(&mut self, slot: usize, time: Real, size: Real, width: Real) {
        self.times[slot] = time;
        if let Some(sizes) = self.sizes.as_mut() {
            sizes[slot] = size;
        }
        if let Some(widths) = self.widths.as_mut() {
            widths[slot] = width;
        }
    }

    /// Appends an event. Sizes and widths are ignored for channels the store does not carry.
    pub fn push(&mut self, time: Real, size: Real, width: Real) {
        let interval = match self.back() {
            Some(back) => {
                if cfg!(debug_assertions) && time < back {
                    warn!(ident = self.ident.as_str(), "push() -> time {time} < back() {back}");
                }
                time - back
            }
            None => MAX_INTERVAL,
        };

        if self.cursor >= self.capacity() {
            if self.cyclic {
                if self.capacity() == 0 {
                    debug!(ident = self.ident.as_str(), "Dropped event at {time}: no capacity");
                    return;
                }
                self.cursor = 0;
                self.base_index += self.capacity();
                self.cycles += 1;
            } else {
                self.grow();
            }
        }

        self.write_slot(self.cursor, time, size, width);
        self.cursor += 1;

        self.mean_size += (size - self.mean_size) * self.mean_ratio;
        self.mean_width += (width - self.mean_width) * self.mean_ratio;
        self.mean_interval += (interval - self.mean_interval) * self.mean_ratio;
        self.mean_quality = self.mean_quality * (1.0 - self.mean_ratio) + self.mean_ratio;

        self.window.include(time);
    }

    /// Appends an event carrying only a time.
    pub fn push_time(&mut self, time: Real) {
        self.push(time, 0.0, 0.0);
    }

    /// Appends a sequence of event times sharing one size and width.
    pub fn push_all(&mut self, times: &[Real], size: Real, width: Real) {
        if !self.cyclic {
            self.reserve(self.len() + times.len(), 0.0);
        }
        for &time in times {
            self.push(time, size, width);
        }
    }

    /// Inserts an event at its sorted position. Has no effect on cyclic stores.
    pub fn insert(&mut self, time: Real, size: Real, width: Real) {
        if self.cyclic {
            debug!(ident = self.ident.as_str(), "insert() is not supported by cyclic stores");
            return;
        }
        let position = self.next(time);
        if position >= self.len() {
            self.push(time, size, width);
            return;
        }
        if self.cursor >= self.capacity() {
            self.grow();
        }
        let cursor = self.cursor;
        self.times.copy_within(position..cursor, position + 1);
        for channel in [self.sizes.as_mut(), self.widths.as_mut()]
            .into_iter()
            .flatten()
        {
            channel.copy_within(position..cursor, position + 1);
        }
        self.write_slot(position, time, size, width);
        self.cursor += 1;
        self.window.include(time);
    }

    /// Merges the events of `other` into this linear store.
    pub fn insert_store(&mut self, other: &EventStore) {
        if self.cyclic {
            debug!(ident = self.ident.as_str(), "insert_store() is not supported by cyclic stores");
            return;
        }
        if let (Some(front), Some(back)) = (other.window.front(), other.window.back()) {
            self.window.include(front);
            self.window.include(back);
        }
        if other.window.stepsize() < self.window.stepsize() {
            self.window.set_stepsize(other.window.stepsize());
        }
        let merged = transform::merge_sorted(self.iter(), other.iter());
        self.cursor = 0;
        self.reserve(merged.len(), 0.0);
        for event in merged {
            let slot = self.cursor;
            self.write_slot(
                slot,
                event.time,
                event.size.unwrap_or_default(),
                event.width.unwrap_or_default(),
            );
            self.cursor += 1;
        }
    }

    /// Removes the event at `index` from a linear store.
    pub fn erase(&mut self, index: usize) {
        if self.cyclic || index >= self.len() {
            return;
        }
        let cursor = self.cursor;
        self.times.copy_within(index + 1..cursor, index);
        for channel in [self.sizes.as_mut(), self.widths.as_mut()]
            .into_iter()
            .flatten()
        {
            channel.copy_within(index + 1..cursor, index);
        }
        self.cursor -= 1;
    }

    /// Removes the newest event.
    pub fn pop(&mut self) {
        let oldest = self.first_stored_index();
        if self.len() <= oldest {
            return;
        }
        // the freed slot no longer holds the event of the previous cycle
        self.retired = self.retired.max(oldest);
        if self.cursor == 0 {
            // step back into the previous cycle
            self.cursor = self.capacity();
            self.base_index -= self.capacity();
            self.cycles = self.cycles.saturating_sub(1);
        }
        self.cursor -= 1;
    }

    /// Time of the event at `index`.
    ///
    /// # Panics
    /// If `index` is beyond the allocated buffer.
    pub fn time(&self, index: usize) -> Real {
        debug_assert!(
            self.is_valid_index(index),
            "index {index} outside [{}, {})",
            self.oldest_valid_index(),
            self.len()
        );
        self.times[self.slot(index)]
    }

    pub fn get(&self, index: usize) -> Option<Event> {
        self.is_valid_index(index).then(|| {
            let slot = self.slot(index);
            Event {
                time: self.times[slot],
                size: self.sizes.as_ref().map(|sizes| sizes[slot]),
                width: self.widths.as_ref().map(|widths| widths[slot]),
            }
        })
    }

    pub fn size_at(&self, index: usize) -> Option<Real> {
        self.get(index).and_then(|event| event.size)
    }

    pub fn width_at(&self, index: usize) -> Option<Real> {
        self.get(index).and_then(|event| event.width)
    }

    /// Time of the oldest accessible event.
    pub fn front(&self) -> Option<Real> {
        self.front_n(0)
    }

    /// Time of the `n`-th oldest accessible event.
    pub fn front_n(&self, n: usize) -> Option<Real> {
        let index = self.oldest_valid_index() + n;
        self.is_valid_index(index).then(|| self.time(index))
    }

    /// Time of the newest event.
    pub fn back(&self) -> Option<Real> {
        self.back_n(0)
    }

    /// Time of the event `n` positions before the newest one.
    pub fn back_n(&self, n: usize) -> Option<Real> {
        let index = self.len().checked_sub(n + 1)?;
        self.is_valid_index(index).then(|| self.time(index))
    }

    /// The accessible events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        (self.oldest_valid_index()..self.len()).filter_map(|index| self.get(index))
    }

    /// The accessible event times, oldest first.
    pub fn collect_times(&self) -> Vec<Real> {
        (self.oldest_valid_index()..self.len())
            .map(|index| self.time(index))
            .collect()
    }

    /// Checks the internal indices.
    pub fn check(&self) -> Result<(), StoreError> {
        let capacity = self.capacity();
        if self.cursor > capacity {
            return Err(StoreError::CursorBeyondCapacity {
                cursor: self.cursor,
                capacity,
            });
        }
        for (channel, buffer) in [("size", &self.sizes), ("width", &self.widths)] {
            if let Some(buffer) = buffer {
                if buffer.len() != capacity {
                    return Err(StoreError::ChannelLength {
                        channel,
                        len: buffer.len(),
                        capacity,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn mean_size(&self) -> Real {
        self.mean_size
    }

    pub fn set_mean_size(&mut self, mean_size: Real) {
        self.mean_size = mean_size;
    }

    pub fn mean_width(&self) -> Real {
        self.mean_width
    }

    pub fn set_mean_width(&mut self, mean_width: Real) {
        self.mean_width = mean_width;
    }

    pub fn mean_interval(&self) -> Real {
        self.mean_interval
    }

    pub fn set_mean_interval(&mut self, mean_interval: Real) {
        self.mean_interval = mean_interval;
    }

    pub fn mean_rate(&self) -> Real {
        if self.mean_interval > 0.0 {
            1.0 / self.mean_interval
        } else {
            0.0
        }
    }

    pub fn set_mean_rate(&mut self, rate: Real) {
        self.mean_interval = if rate > 0.0 { 1.0 / rate } else { MAX_INTERVAL };
    }

    pub fn mean_quality(&self) -> Real {
        self.mean_quality
    }

    pub fn set_mean_quality(&mut self, mean_quality: Real) {
        self.mean_quality = mean_quality;
    }

    pub fn mean_ratio(&self) -> Real {
        self.mean_ratio
    }

    /// Sets the smoothing ratio of the running means, clamped into `(0, 1]`.
    pub fn set_mean_ratio(&mut self, ratio: Real) {
        self.mean_ratio = if ratio > 1.0 {
            1.0
        } else if ratio <= 0.0 {
            MIN_MEAN_RATIO
        } else {
            ratio
        };
    }

    /// Folds a detection outcome into the mean quality.
    pub fn update_mean_quality(&mut self, good: bool) {
        let gain = if good { self.mean_ratio } else { 0.0 };
        self.mean_quality = self.mean_quality * (1.0 - self.mean_ratio) + gain;
    }

    /// Folds `n` copies of an event of the given size, width and rate into the means
    /// without storing it.
    pub fn update_mean(&mut self, n: usize, size: Real, width: Real, rate: Real) {
        let interval = if rate > 0.0 { 1.0 / rate } else { MAX_INTERVAL };
        for _ in 0..n {
            self.mean_size += (size - self.mean_size) * self.mean_ratio;
            self.mean_width += (width - self.mean_width) * self.mean_ratio;
            self.mean_interval += (interval - self.mean_interval) * self.mean_ratio;
        }
    }
}

impl Index<usize> for EventStore {
    type Output = Real;

    fn index(&self, index: usize) -> &Self::Output {
        &self.times[self.slot(index)]
    }
}

impl AddAssign<Real> for EventStore {
    fn add_assign(&mut self, x: Real) {
        let written = self.written_slots();
        self.times[..written].iter_mut().for_each(|t| *t += x);
        self.window.shift(x);
        self.signal_time = self.signal_time.map(|t| t + x);
    }
}

impl SubAssign<Real> for EventStore {
    fn sub_assign(&mut self, x: Real) {
        *self += -x;
    }
}

impl MulAssign<Real> for EventStore {
    fn mul_assign(&mut self, x: Real) {
        let written = self.written_slots();
        self.times[..written].iter_mut().for_each(|t| *t *= x);
        self.window.scale(x);
        self.signal_time = self.signal_time.map(|t| t * x);
    }
}

impl DivAssign<Real> for EventStore {
    fn div_assign(&mut self, x: Real) {
        *self *= 1.0 / x;
    }
}

impl EventStore {
    /// Slots that may hold events: the whole buffer once a cyclic store has wrapped.
    fn written_slots(&self) -> usize {
        if self.cyclic && self.base_index > 0 {
            self.capacity()
        } else {
            self.cursor
        }
    }
}

impl Display for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "         Ident: {}", self.ident)?;
        writeln!(f, "      Capacity: {}", self.capacity())?;
        writeln!(f, "         Sizes: {}", self.has_sizes())?;
        writeln!(f, "        Widths: {}", self.has_widths())?;
        writeln!(f, "        Cyclic: {}", self.cyclic)?;
        writeln!(f, "        Cursor: {}", self.cursor)?;
        writeln!(f, "    Base Index: {}", self.base_index)?;
        writeln!(f, "        Cycles: {}", self.cycles)?;
        writeln!(f, "   Signal Time: {:?}", self.signal_time)?;
        writeln!(f, "     Mean Size: {}", self.mean_size)?;
        writeln!(f, "    Mean Width: {}", self.mean_width)?;
        writeln!(f, " Mean Interval: {}", self.mean_interval)?;
        write!(f, "  Mean Quality: {}", self.mean_quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn push_keeps_times_in_order() {
        let mut store = EventStore::new();
        for i in 0..25 {
            store.push(i as Real * 0.5, i as Real, 0.0);
        }
        assert_eq!(store.len(), 25);
        assert!(store.capacity() >= 25);
        assert!(
            store
                .collect_times()
                .windows(2)
                .all(|pair| pair[0] <= pair[1])
        );
        assert_eq!(store.front(), Some(0.0));
        assert_eq!(store.back(), Some(12.0));
        assert_eq!(store.back_n(2), Some(11.0));
        assert_eq!(store.window().offset(), Some(0.0));
        assert_approx_eq!(store.window().length(), 12.0, 1e-12);
    }

    #[test]
    fn first_push_sets_the_means() {
        let mut store = EventStore::with_capacity(4, true, false);
        store.set_mean_ratio(1.0);
        store.push(1.0, 3.0, 0.25);
        assert_eq!(store.mean_size(), 3.0);
        assert_eq!(store.mean_width(), 0.25);
        assert_eq!(store.mean_interval(), MAX_INTERVAL);
        assert_eq!(store.mean_quality(), 1.0);
        store.push(1.5, 5.0, 0.0);
        assert_approx_eq!(store.mean_interval(), 0.5, 1e-12);
        assert_eq!(store.size_at(1), Some(5.0));
        assert_eq!(store.width_at(1), None);
    }

    #[test]
    fn mean_ratio_is_clamped() {
        let mut store = EventStore::new();
        store.set_mean_ratio(2.0);
        assert_eq!(store.mean_ratio(), 1.0);
        store.set_mean_ratio(0.0);
        assert_eq!(store.mean_ratio(), MIN_MEAN_RATIO);
        store.set_mean_ratio(0.1);
        assert_eq!(store.mean_ratio(), 0.1);
    }

    #[test]
    fn mean_quality_decays_on_rejections() {
        let mut store = EventStore::new();
        store.set_mean_ratio(0.5);
        store.update_mean_quality(true);
        assert_approx_eq!(store.mean_quality(), 0.5, 1e-12);
        store.update_mean_quality(false);
        assert_approx_eq!(store.mean_quality(), 0.25, 1e-12);
    }

    #[test]
    fn cyclic_store_keeps_the_newest_events() {
        let capacity = 8;
        let extra = 5;
        let mut store = EventStore::cyclic(capacity, true, false);
        for i in 0..capacity + extra {
            store.push(i as Real, 2.0 * i as Real, 0.0);
        }
        assert_eq!(store.len(), capacity + extra);
        assert_eq!(store.oldest_valid_index(), extra);
        assert_eq!(store.cycles(), 1);
        assert_eq!(store.front(), Some(extra as Real));
        assert_eq!(store.back(), Some((capacity + extra - 1) as Real));
        assert_eq!(store.get(extra - 1), None);
        assert_eq!(
            store.get(extra + 1),
            Some(Event {
                time: (extra + 1) as Real,
                size: Some(2.0 * (extra + 1) as Real),
                width: None
            })
        );
        let expected: Vec<Real> = (extra..capacity + extra).map(|i| i as Real).collect();
        assert_eq!(store.collect_times(), expected);
    }

    #[test]
    fn cyclic_store_without_capacity_drops_events() {
        let mut store = EventStore::cyclic(0, false, false);
        store.push_time(1.0);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn reserve_migrates_wrapped_cyclic_store() {
        let mut store = EventStore::cyclic(4, false, true);
        for i in 0..6 {
            store.push(i as Real, 0.0, i as Real * 0.1);
        }
        assert_eq!(store.collect_times(), vec![2.0, 3.0, 4.0, 5.0]);

        store.reserve(10, 0.0);
        assert_eq!(store.capacity(), 10);
        assert_eq!(store.len(), 6);
        assert_eq!(store.oldest_valid_index(), 2);
        assert_eq!(store.collect_times(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_approx_eq!(store.width_at(3).unwrap_or_default(), 0.3, 1e-12);
        assert_eq!(store.next(3.5), 4);
        assert_eq!(store.previous(3.5), Some(3));

        for i in 6..14 {
            store.push_time(i as Real);
        }
        assert_eq!(store.len(), 14);
        assert_eq!(store.oldest_valid_index(), 4);
        let expected: Vec<Real> = (4..14).map(|i| i as Real).collect();
        assert_eq!(store.collect_times(), expected);
        assert!(store.check().is_ok());
    }

    #[test]
    fn free_shrinks_to_the_oldest_events() {
        let mut store = EventStore::from_times(&[1.0, 2.0, 3.0, 4.0]);
        store.free(2, 0.0);
        assert_eq!(store.capacity(), 2);
        assert_eq!(store.collect_times(), vec![1.0, 2.0]);
    }

    #[test]
    fn insert_keeps_order() {
        let mut store = EventStore::from_times(&[1.0, 3.0, 5.0]);
        store.insert(4.0, 0.0, 0.0);
        store.insert(0.5, 0.0, 0.0);
        store.insert(6.0, 0.0, 0.0);
        assert_eq!(store.collect_times(), vec![0.5, 1.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(store.window().front(), Some(0.5));

        let mut cyclic = EventStore::cyclic(4, false, false);
        cyclic.insert(1.0, 0.0, 0.0);
        assert_eq!(cyclic.len(), 0);
    }

    #[test]
    fn insert_store_merges() {
        let mut store = EventStore::from_times(&[1.0, 3.0, 5.0]);
        store.insert_store(&EventStore::from_times(&[2.0, 6.0]));
        assert_eq!(store.collect_times(), vec![1.0, 2.0, 3.0, 5.0, 6.0]);
        assert_eq!(store.window().back(), Some(6.0));
    }

    #[test]
    fn erase_and_pop() {
        let mut store = EventStore::from_times(&[1.0, 2.0, 3.0, 4.0]);
        store.erase(1);
        assert_eq!(store.collect_times(), vec![1.0, 3.0, 4.0]);
        store.erase(7);
        assert_eq!(store.len(), 3);
        store.pop();
        assert_eq!(store.collect_times(), vec![1.0, 3.0]);
        store.pop();
        store.pop();
        store.pop();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn pop_steps_back_into_previous_cycle() {
        let mut store = EventStore::cyclic(3, false, false);
        for i in 0..4 {
            store.push_time(i as Real);
        }
        assert_eq!(store.collect_times(), vec![1.0, 2.0, 3.0]);
        store.pop();
        assert_eq!(store.cycles(), 1);
        assert_eq!(store.len(), 3);
        store.pop();
        assert_eq!(store.cycles(), 0);
        assert_eq!(store.collect_times(), vec![1.0]);
        store.push_time(2.5);
        assert_eq!(store.collect_times(), vec![1.0, 2.5]);
    }

    #[test]
    fn resize_pads_linear_store() {
        let mut store = EventStore::from_times(&[1.0]);
        store.resize(3, 7.0);
        assert_eq!(store.collect_times(), vec![1.0, 7.0, 7.0]);
        assert_eq!(store.mean_interval(), MAX_INTERVAL);
        store.resize(0, 0.0);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn affine_transforms_move_times_and_window() {
        let mut store = EventStore::from_times(&[1.0, 2.0]);
        store.set_signal_time(Some(0.5));
        store += 1.0;
        assert_eq!(store.collect_times(), vec![2.0, 3.0]);
        assert_eq!(store.window().offset(), Some(2.0));
        store *= 2.0;
        assert_eq!(store.collect_times(), vec![4.0, 6.0]);
        assert_eq!(store.signal_time(), Some(3.0));
        store /= 2.0;
        store -= 1.0;
        assert_eq!(store.collect_times(), vec![1.0, 2.0]);
    }

    #[test]
    fn check_reports_corrupt_cursor() {
        let mut store = EventStore::with_capacity(2, false, false);
        assert_eq!(store.check(), Ok(()));
        store.cursor = 3;
        assert_eq!(
            store.check(),
            Err(StoreError::CursorBeyondCapacity {
                cursor: 3,
                capacity: 2
            })
        );
    }
}
