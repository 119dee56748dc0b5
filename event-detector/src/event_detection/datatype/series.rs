use super::super::Real;
use std::ops::{Index, IndexMut};

/// Uniformly sampled values, the `i`-th value belonging to `offset + i*stepsize`.
/// Windowed estimators on event stores write their results into a series.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledSeries {
    offset: Real,
    stepsize: Real,
    values: Vec<Real>,
}

impl Default for SampledSeries {
    fn default() -> Self {
        Self {
            offset: 0.0,
            stepsize: 1.0,
            values: Vec::new(),
        }
    }
}

impl SampledSeries {
    pub fn new(len: usize, offset: Real, stepsize: Real) -> Self {
        Self {
            offset,
            stepsize,
            values: vec![0.0; len],
        }
    }

    /// Creates a zeroed series covering `[left, right)`.
    pub fn spanning(left: Real, right: Real, stepsize: Real) -> Self {
        let len = if right > left && stepsize > 0.0 {
            ((right - left) / stepsize + 1e-6).floor() as usize
        } else {
            0
        };
        Self::new(len, left, stepsize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn offset(&self) -> Real {
        self.offset
    }

    pub fn stepsize(&self) -> Real {
        self.stepsize
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [Real] {
        &mut self.values
    }

    pub fn fill(&mut self, value: Real) {
        self.values.fill(value);
    }

    /// Position of the `i`-th sample.
    pub fn pos(&self, i: usize) -> Real {
        self.offset + i as Real * self.stepsize
    }

    /// Index of the sample whose bin contains `x`; negative before the offset.
    pub fn index(&self, x: Real) -> isize {
        ((x - self.offset) / self.stepsize).floor() as isize
    }

    /// Number of samples spanned by the interval `iv`.
    pub fn indices(&self, iv: Real) -> isize {
        (iv / self.stepsize).floor() as isize
    }

    pub fn interval(&self, n: isize) -> Real {
        n as Real * self.stepsize
    }

    pub fn length(&self) -> Real {
        self.len() as Real * self.stepsize
    }

    pub fn range_front(&self) -> Real {
        self.offset
    }

    pub fn range_back(&self) -> Real {
        self.offset + self.length()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Real, Real)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.pos(i), v))
    }
}

impl Index<usize> for SampledSeries {
    type Output = Real;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl IndexMut<usize> for SampledSeries {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.values[index]
    }
}
