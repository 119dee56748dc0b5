//! Normalised smoothing kernels used by the kernel rate estimators.
//! Each kernel integrates to one and is centred on zero.

use super::super::Real;
use std::f64::consts::PI;

pub trait Kernel {
    /// The kernel evaluated at `x`.
    fn value(&self, x: Real) -> Real;

    fn mean(&self) -> Real {
        0.0
    }

    fn stdev(&self) -> Real;

    /// The largest value the kernel takes.
    fn max(&self) -> Real;

    /// Left end of the support over which the kernel is summed.
    fn left(&self) -> Real;

    /// Right end of the support over which the kernel is summed.
    fn right(&self) -> Real;
}

/// Box of the given width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectKernel {
    width: Real,
}

impl RectKernel {
    pub fn new(width: Real) -> Self {
        Self { width }
    }

    pub fn with_stdev(stdev: Real) -> Self {
        Self::new(stdev * Real::sqrt(12.0))
    }

    pub fn width(&self) -> Real {
        self.width
    }
}

impl Kernel for RectKernel {
    fn value(&self, x: Real) -> Real {
        if x.abs() <= 0.5 * self.width {
            1.0 / self.width
        } else {
            0.0
        }
    }

    fn stdev(&self) -> Real {
        self.width / Real::sqrt(12.0)
    }

    fn max(&self) -> Real {
        1.0 / self.width
    }

    fn left(&self) -> Real {
        -0.5 * self.width
    }

    fn right(&self) -> Real {
        0.5 * self.width
    }
}

/// Triangle falling linearly from its peak to zero at `±half_width`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangularKernel {
    half_width: Real,
}

impl TriangularKernel {
    pub fn new(half_width: Real) -> Self {
        Self { half_width }
    }

    pub fn with_stdev(stdev: Real) -> Self {
        Self::new(stdev * Real::sqrt(6.0))
    }
}

impl Kernel for TriangularKernel {
    fn value(&self, x: Real) -> Real {
        if x.abs() <= self.half_width {
            (1.0 - x.abs() / self.half_width) / self.half_width
        } else {
            0.0
        }
    }

    fn stdev(&self) -> Real {
        self.half_width / Real::sqrt(6.0)
    }

    fn max(&self) -> Real {
        1.0 / self.half_width
    }

    fn left(&self) -> Real {
        -self.half_width
    }

    fn right(&self) -> Real {
        self.half_width
    }
}

/// Parabola `3/(4a) (1 - x²/a²)` on `[-a, a]` with `a = √5 σ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpanechnikovKernel {
    stdev: Real,
}

impl EpanechnikovKernel {
    pub fn with_stdev(stdev: Real) -> Self {
        Self { stdev }
    }

    fn half_width(&self) -> Real {
        Real::sqrt(5.0) * self.stdev
    }
}

impl Kernel for EpanechnikovKernel {
    fn value(&self, x: Real) -> Real {
        let half_width = self.half_width();
        if x.abs() <= half_width {
            let y = x / self.stdev;
            0.75 / half_width * (1.0 - 0.2 * y * y)
        } else {
            0.0
        }
    }

    fn stdev(&self) -> Real {
        self.stdev
    }

    fn max(&self) -> Real {
        0.75 / self.half_width()
    }

    fn left(&self) -> Real {
        -self.half_width()
    }

    fn right(&self) -> Real {
        self.half_width()
    }
}

/// Normal density, truncated to four standard deviations when summed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussKernel {
    stdev: Real,
}

impl GaussKernel {
    pub fn with_stdev(stdev: Real) -> Self {
        Self { stdev }
    }
}

impl Kernel for GaussKernel {
    fn value(&self, x: Real) -> Real {
        let z = x / self.stdev;
        self.max() * (-0.5 * z * z).exp()
    }

    fn stdev(&self) -> Real {
        self.stdev
    }

    fn max(&self) -> Real {
        1.0 / (Real::sqrt(2.0 * PI) * self.stdev)
    }

    fn left(&self) -> Real {
        -4.0 * self.stdev
    }

    fn right(&self) -> Real {
        4.0 * self.stdev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn moments(kernel: &dyn Kernel) -> (Real, Real) {
        let dx = 1e-4;
        let n = ((kernel.right() - kernel.left()) / dx).round() as usize;
        let (area, second) = (0..n)
            .map(|i| kernel.left() + (i as Real + 0.5) * dx)
            .map(|x| (kernel.value(x) * dx, x * x * kernel.value(x) * dx))
            .fold((0.0, 0.0), |(a, s), (da, ds)| (a + da, s + ds));
        (area, second.sqrt())
    }

    #[test]
    fn kernels_are_normalised() {
        let kernels: [Box<dyn Kernel>; 4] = [
            Box::new(RectKernel::with_stdev(0.1)),
            Box::new(TriangularKernel::with_stdev(0.1)),
            Box::new(EpanechnikovKernel::with_stdev(0.1)),
            Box::new(GaussKernel::with_stdev(0.1)),
        ];
        for kernel in kernels {
            let (area, stdev) = moments(kernel.as_ref());
            assert_approx_eq!(area, 1.0, 1e-3);
            assert_approx_eq!(stdev, kernel.stdev(), 1e-3);
            assert_approx_eq!(kernel.value(0.0), kernel.max(), 1e-9);
        }
    }

    #[test]
    fn rect_kernel_support() {
        let kernel = RectKernel::new(2.0);
        assert_approx_eq!(kernel.value(0.9), 0.5, 1e-12);
        assert_eq!(kernel.value(1.1), 0.0);
        assert_approx_eq!(kernel.left(), -1.0, 1e-12);
        assert_approx_eq!(kernel.right(), 1.0, 1e-12);
    }
}
