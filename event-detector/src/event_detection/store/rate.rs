//! Rate, frequency and interval estimates sampled into a [SampledSeries].
//!
//! Positions of the series are relative to an `origin` time, so that
//! repeated trials aligned to different stimulus times can be averaged.
//! The `add_*` variants fold one more trial into a running mean and
//! increment the caller's trial counter.

use super::{EventStore, Real};
use crate::event_detection::{Kernel, SampledSeries};

impl EventStore {
    /// Number of events within `[from, to)`.
    fn count_in(&self, from: Real, to: Real) -> usize {
        self.next(to).saturating_sub(self.next(from))
    }

    /// Box-car rate: each sample counts the events in `[pos, pos + width)`.
    /// A non-positive `width` uses the stepsize of `rate`.
    pub fn rate_into(&self, rate: &mut SampledSeries, width: Real, origin: Real) {
        rate.fill(0.0);
        let mut trials = 0;
        self.add_rate_into(rate, &mut trials, width, origin);
    }

    pub fn add_rate_into(
        &self,
        rate: &mut SampledSeries,
        trials: &mut usize,
        width: Real,
        origin: Real,
    ) {
        *trials += 1;
        let width = if width <= 0.0 { rate.stepsize() } else { width };
        for i in 0..rate.len() {
            let left = origin + rate.pos(i);
            let r = self.count_in(left, left + width) as Real / width;
            rate[i] += (r - rate[i]) / *trials as Real;
        }
    }

    /// Box-car rate treating the range of `rate` as one period:
    /// windows running over the back wrap around to the front.
    pub fn cyclic_rate_into(&self, rate: &mut SampledSeries, width: Real, origin: Real) {
        rate.fill(0.0);
        let mut trials = 0;
        self.add_cyclic_rate_into(rate, &mut trials, width, origin);
    }

    pub fn add_cyclic_rate_into(
        &self,
        rate: &mut SampledSeries,
        trials: &mut usize,
        width: Real,
        origin: Real,
    ) {
        *trials += 1;
        let width = (if width <= 0.0 { rate.stepsize() } else { width }).min(rate.length());
        let lmarg = origin + rate.range_front();
        let rmarg = origin + rate.range_back();
        for i in 0..rate.len() {
            let left = origin + rate.pos(i);
            let mut right = left + width;
            let count = if right > rmarg {
                right -= rate.length();
                self.count_in(left, rmarg) + self.count_in(lmarg, right)
            } else {
                self.count_in(left, right)
            };
            let r = count as Real / width;
            rate[i] += (r - rate[i]) / *trials as Real;
        }
    }

    /// Sums `kernel` centred on every event within the range of `rate` into `sum`.
    /// `wrap` folds contributions beyond either end back into the range.
    fn sum_kernels(
        &self,
        rate: &SampledSeries,
        kernel: &dyn Kernel,
        origin: Real,
        wrap: bool,
        sum: &mut [Real],
    ) {
        let bins = rate.len() as isize;
        if bins == 0 {
            return;
        }
        let first = self.next(origin + rate.range_front());
        let Some(last) = self.previous(origin + rate.range_back()) else {
            return;
        };
        let (from, to) = (rate.indices(kernel.left()), rate.indices(kernel.right()));
        for k in first..=last {
            let t = self.time(k) - origin;
            let bin = rate.index(t);
            let dt = t - rate.offset() - rate.interval(bin);
            for i in from..to {
                let inx = if wrap {
                    (bin + i).rem_euclid(bins)
                } else {
                    bin + i
                };
                if (0..bins).contains(&inx) {
                    sum[inx as usize] += kernel.value(rate.interval(i) - dt);
                }
            }
        }
    }

    fn fold_trial(rate: &mut SampledSeries, trials: &mut usize, trial: &[Real]) {
        *trials += 1;
        let n = *trials as Real;
        rate.values_mut()
            .iter_mut()
            .zip(trial)
            .for_each(|(mean, &value)| *mean += (value - *mean) / n);
    }

    /// Kernel density estimate of the event rate.
    pub fn kernel_rate_into(&self, rate: &mut SampledSeries, kernel: &dyn Kernel, origin: Real) {
        rate.fill(0.0);
        let mut trials = 0;
        self.add_kernel_rate_into(rate, &mut trials, kernel, origin);
    }

    pub fn add_kernel_rate_into(
        &self,
        rate: &mut SampledSeries,
        trials: &mut usize,
        kernel: &dyn Kernel,
        origin: Real,
    ) {
        let mut trial = vec![0.0; rate.len()];
        self.sum_kernels(rate, kernel, origin, false, &mut trial);
        Self::fold_trial(rate, trials, &trial);
    }

    /// Kernel rate estimate treating the range of `rate` as one period.
    pub fn cyclic_kernel_rate_into(
        &self,
        rate: &mut SampledSeries,
        kernel: &dyn Kernel,
        origin: Real,
    ) {
        rate.fill(0.0);
        let mut trials = 0;
        self.add_cyclic_kernel_rate_into(rate, &mut trials, kernel, origin);
    }

    pub fn add_cyclic_kernel_rate_into(
        &self,
        rate: &mut SampledSeries,
        trials: &mut usize,
        kernel: &dyn Kernel,
        origin: Real,
    ) {
        let mut trial = vec![0.0; rate.len()];
        self.sum_kernels(rate, kernel, origin, true, &mut trial);
        Self::fold_trial(rate, trials, &trial);
    }

    /// Calls `f` with the interval enclosing each sample position of `series`,
    /// or `None` outside the events.
    fn for_each_enclosing_interval(
        &self,
        series: &mut SampledSeries,
        origin: Real,
        mut f: impl FnMut(&mut Real, Option<Real>),
    ) {
        let mut k = self.next(origin + series.range_front());
        for i in 0..series.len() {
            let position = origin + series.pos(i);
            while k < self.len() && self.time(k) < position {
                k += 1;
            }
            let interval = (k < self.len() && k > self.oldest_valid_index())
                .then(|| self.time(k) - self.time(k - 1));
            f(&mut series[i], interval);
        }
    }

    /// Samples the interval enclosing each position, zero outside the events.
    pub fn interval_into(&self, intervals: &mut SampledSeries, origin: Real) {
        intervals.fill(0.0);
        let mut trials = 0;
        self.add_interval_into(intervals, &mut trials, origin);
    }

    pub fn add_interval_into(
        &self,
        intervals: &mut SampledSeries,
        trials: &mut usize,
        origin: Real,
    ) {
        *trials += 1;
        let n = *trials as Real;
        self.for_each_enclosing_interval(intervals, origin, |mean, interval| {
            *mean += (interval.unwrap_or_default() - *mean) / n;
        });
    }

    /// Samples the instantaneous frequency, `default` outside the events.
    pub fn frequency_into(&self, frequency: &mut SampledSeries, origin: Real, default: Real) {
        frequency.fill(0.0);
        let mut trials = 0;
        self.add_frequency_into(frequency, &mut trials, origin, default);
    }

    pub fn add_frequency_into(
        &self,
        frequency: &mut SampledSeries,
        trials: &mut usize,
        origin: Real,
        default: Real,
    ) {
        *trials += 1;
        let n = *trials as Real;
        self.for_each_enclosing_interval(frequency, origin, |mean, interval| {
            let f = interval
                .filter(|&interval| interval > 0.0)
                .map_or(default, |interval| 1.0 / interval);
            *mean += (f - *mean) / n;
        });
    }
}
