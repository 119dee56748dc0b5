use super::{Detector, Real, Threshold, Trace};

/// Relaxation of a threshold towards its minimum.
///
/// Once `delay` has passed since the last accepted event the threshold
/// decays exponentially with time constant `decay`.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Decay {
    pub delay: Real,
    pub decay: Real,
}

impl Decay {
    pub fn new(delay: Real, decay: Real) -> Self {
        Self { delay, decay }
    }

    /// Lets `threshold` decay from time `from` until time `to`.
    ///
    /// The interval is integrated in Euler steps of at most a hundredth of the
    /// time constant. Without a positive time constant the threshold jumps to
    /// its minimum.
    pub fn apply(&self, threshold: &mut Threshold, from: Real, to: Real) {
        let dt = to - from;
        if dt <= 0.0 {
            return;
        }
        let (steps, factor) = if self.decay > 0.0 {
            let step = 0.01 * self.decay;
            let steps = if dt > step { (dt / step).ceil() as usize } else { 1 };
            (steps, dt / steps as Real / self.decay)
        } else {
            (1, 1.0)
        };
        for _ in 0..steps {
            threshold.value += (threshold.min - threshold.value) * factor;
        }
    }
}

impl Detector {
    /// Decays the threshold over the time since the previous sample, once
    /// the delay after the last accepted event has passed.
    pub(super) fn decay_threshold(&mut self, trace: &Trace, threshold: &mut Threshold, decay: &Decay) {
        let now = trace.time(self.index);
        if now - self.previous_event_time > decay.delay && self.index > trace.first() {
            decay.apply(threshold, self.previous_sample_time, now);
        }
        self.previous_sample_time = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn decays_exponentially() {
        let decay = Decay::new(0.0, 0.1);
        let mut threshold = Threshold::new(1.0, 0.0, 2.0);
        decay.apply(&mut threshold, 0.0, 0.1);
        assert_approx_eq!(threshold.value, Real::exp(-1.0), 5e-3);
    }

    #[test]
    fn single_step_for_short_intervals() {
        let decay = Decay::new(0.0, 0.1);
        let mut threshold = Threshold::new(1.0, 0.0, 2.0);
        decay.apply(&mut threshold, 0.0, 0.0005);
        assert_approx_eq!(threshold.value, 0.995);
    }

    #[test]
    fn no_time_constant_jumps_to_min() {
        let mut threshold = Threshold::new(1.0, 0.25, 2.0);
        Decay::new(0.0, 0.0).apply(&mut threshold, 0.0, 1.0);
        assert_eq!(threshold.value, 0.25);

        threshold.value = 1.0;
        Decay::new(0.0, 0.0).apply(&mut threshold, 1.0, 1.0);
        assert_eq!(threshold.value, 1.0);
    }
}
