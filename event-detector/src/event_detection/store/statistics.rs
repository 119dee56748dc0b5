use super::{EventStore, Real};
use std::{f64::consts::TAU, ops::RangeInclusive};

fn with_interval(span: Option<RangeInclusive<usize>>) -> Option<RangeInclusive<usize>> {
    span.filter(|span| span.end() > span.start())
}

fn frequency_of((mean, sd): (Real, Real)) -> (Real, Real) {
    if mean > 0.0 {
        (1.0 / mean, sd / (mean * mean))
    } else {
        (0.0, 0.0)
    }
}

impl EventStore {
    /// The indices `n..end` as an inclusive range, or `None` if empty.
    fn indices(n: usize, end: usize) -> Option<RangeInclusive<usize>> {
        (end > n).then(|| n..=end - 1)
    }

    /// Indices of the events within `[t0, t1)`, or `None` if there are none.
    fn span(&self, t0: Real, t1: Real) -> Option<RangeInclusive<usize>> {
        if t1 <= t0 {
            return None;
        }
        Self::indices(self.next(t0), self.next(t1))
    }

    /// Indices of the events bounding the last `n` intervals.
    fn last_span(&self, n: usize) -> Option<RangeInclusive<usize>> {
        let start = self.len().checked_sub(n + 1)?;
        if n == 0 || start < self.oldest_valid_index() {
            return None;
        }
        Self::indices(start, self.len())
    }

    /// Indices of the events at or after `time`.
    fn span_since(&self, time: Real) -> Option<RangeInclusive<usize>> {
        Self::indices(self.next(time), self.len())
    }

    /// Like `span` but requiring at least one interval.
    fn interval_span(&self, t0: Real, t1: Real) -> Option<RangeInclusive<usize>> {
        with_interval(self.span(t0, t1))
    }

    fn isis(&self, span: RangeInclusive<usize>) -> impl Iterator<Item = Real> + '_ {
        let (n, p) = span.into_inner();
        (n + 1..=p).map(|k| self.time(k) - self.time(k - 1))
    }

    /// Number of events within `[t0, t1)`.
    pub fn count(&self, t0: Real, t1: Real) -> usize {
        self.span(t0, t1).map_or(0, |span| span.count())
    }

    /// Number of events at or after `time`.
    pub fn count_since(&self, time: Real) -> usize {
        self.len() - self.next(time)
    }

    /// Events per time unit within `[t0, t1)`.
    pub fn rate(&self, t0: Real, t1: Real) -> Real {
        self.count(t0, t1) as Real / (t1 - t0).max(Real::MIN_POSITIVE)
    }

    /// Rate of the last `n` intervals.
    pub fn rate_last(&self, n: usize) -> Real {
        if n == 0 || self.len() - self.oldest_valid_index() <= n {
            return 0.0;
        }
        match (self.back(), self.back_n(n)) {
            (Some(back), Some(front)) if back > front => n as Real / (back - front),
            _ => 0.0,
        }
    }

    /// Rate of the events from `time` to the back of the observation window.
    pub fn rate_since(&self, time: Real) -> Real {
        match self.window.back() {
            Some(back) if back > time => self.count_since(time) as Real / (back - time),
            _ => 0.0,
        }
    }

    /// Mean and standard deviation of the inter-event intervals within `[t0, t1)`.
    pub fn interval(&self, t0: Real, t1: Real) -> (Real, Real) {
        self.interval_over(self.span(t0, t1))
    }

    fn interval_over(&self, span: Option<RangeInclusive<usize>>) -> (Real, Real) {
        let Some(span) = with_interval(span) else {
            return (0.0, 0.0);
        };
        let (n, p) = (*span.start(), *span.end());
        let mean = (self.time(p) - self.time(n)) / (p - n) as Real;
        let variance = self
            .isis(span)
            .enumerate()
            .fold(0.0, |var, (k, isi)| {
                let deviation = isi - mean;
                var + (deviation * deviation - var) / (k + 1) as Real
            });
        (mean, variance.sqrt())
    }

    /// Interval statistics of the last `n` intervals.
    pub fn interval_last(&self, n: usize) -> (Real, Real) {
        self.interval_over(self.last_span(n))
    }

    /// Interval statistics of the events at or after `time`.
    pub fn interval_since(&self, time: Real) -> (Real, Real) {
        self.interval_over(self.span_since(time))
    }

    /// The interval enclosing `time`, or zero outside the events.
    pub fn interval_at(&self, time: Real) -> Real {
        let n = self.next(time);
        if n < self.len() && n > self.oldest_valid_index() {
            self.time(n) - self.time(n - 1)
        } else {
            0.0
        }
    }

    /// The inter-event intervals within `[t0, t1)`.
    pub fn intervals(&self, t0: Real, t1: Real) -> Vec<Real> {
        self.interval_span(t0, t1)
            .map(|span| self.isis(span).collect())
            .unwrap_or_default()
    }

    /// Mean frequency within `[t0, t1)` and its standard deviation
    /// propagated from the interval spread.
    pub fn frequency(&self, t0: Real, t1: Real) -> (Real, Real) {
        frequency_of(self.interval(t0, t1))
    }

    pub fn frequency_last(&self, n: usize) -> (Real, Real) {
        frequency_of(self.interval_last(n))
    }

    pub fn frequency_since(&self, time: Real) -> (Real, Real) {
        frequency_of(self.interval_since(time))
    }

    /// Inverse of the interval enclosing `time`, or `default` outside the events.
    pub fn frequency_at(&self, time: Real, default: Real) -> Real {
        match self.interval_at(time) {
            interval if interval > 0.0 => 1.0 / interval,
            _ => default,
        }
    }

    /// Time from `time` to the next event.
    pub fn latency(&self, time: Real) -> Option<Real> {
        self.next_time(time).map(|next| next - time)
    }

    /// Events per period within `[t0, t1)`, the range cut to whole periods.
    pub fn locking(&self, t0: Real, t1: Real, period: Real) -> Real {
        if t1 <= t0 || period <= 0.0 {
            return 0.0;
        }
        let periods = ((t1 - t0) / period + 1e-6).floor();
        match self.interval_span(t0, t0 + periods * period) {
            Some(span) => span.count() as Real / periods,
            None => 0.0,
        }
    }

    fn phase_sums(&self, t0: Real, t1: Real, period: Real) -> Option<(Real, Real, usize)> {
        let span = self.interval_span(t0, t1)?;
        let count = span.clone().count();
        let (cos, sin) = span
            .map(|k| TAU * (self.time(k) - t0) / period)
            .fold((0.0, 0.0), |(c, s), phi| (c + phi.cos(), s + phi.sin()));
        Some((cos, sin, count))
    }

    /// Phase locking of the events within `[t0, t1)` to `period`, between 0 and 1.
    pub fn vector_strength(&self, t0: Real, t1: Real, period: Real) -> Real {
        self.phase_sums(t0, t1, period)
            .map_or(0.0, |(cos, sin, count)| cos.hypot(sin) / count as Real)
    }

    /// Mean phase of the events within `[t0, t1)` relative to `period`.
    pub fn vector_phase(&self, t0: Real, t1: Real, period: Real) -> Real {
        self.phase_sums(t0, t1, period)
            .map_or(0.0, |(cos, sin, _)| sin.atan2(cos))
    }

    fn channel_in(
        &self,
        t0: Real,
        t1: Real,
        channel: fn(&EventStore, usize) -> Option<Real>,
    ) -> Option<Vec<Real>> {
        let span = self.span(t0, t1)?;
        span.map(|k| channel(self, k)).collect()
    }

    pub fn min_size(&self, t0: Real, t1: Real) -> Real {
        self.channel_in(t0, t1, EventStore::size_at)
            .and_then(|sizes| sizes.into_iter().reduce(Real::min))
            .unwrap_or(self.mean_size)
    }

    pub fn max_size(&self, t0: Real, t1: Real) -> Real {
        self.channel_in(t0, t1, EventStore::size_at)
            .and_then(|sizes| sizes.into_iter().reduce(Real::max))
            .unwrap_or(self.mean_size)
    }

    /// Mean size of the events within `[t0, t1)`; the running mean if the
    /// store has no size channel or no events there.
    pub fn mean_size_in(&self, t0: Real, t1: Real) -> Real {
        self.channel_in(t0, t1, EventStore::size_at)
            .and_then(|sizes| mean(&sizes))
            .unwrap_or(self.mean_size)
    }

    pub fn min_width(&self, t0: Real, t1: Real) -> Real {
        self.channel_in(t0, t1, EventStore::width_at)
            .and_then(|widths| widths.into_iter().reduce(Real::min))
            .unwrap_or(self.mean_width)
    }

    pub fn max_width(&self, t0: Real, t1: Real) -> Real {
        self.channel_in(t0, t1, EventStore::width_at)
            .and_then(|widths| widths.into_iter().reduce(Real::max))
            .unwrap_or(self.mean_width)
    }

    pub fn mean_width_in(&self, t0: Real, t1: Real) -> Real {
        self.channel_in(t0, t1, EventStore::width_at)
            .and_then(|widths| mean(&widths))
            .unwrap_or(self.mean_width)
    }
}

fn mean(values: &[Real]) -> Option<Real> {
    (!values.is_empty()).then(|| values.iter().sum::<Real>() / values.len() as Real)
}
