//! Rolling scalar series derived from how much the lattice changes each tick.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::SimulationError;
use crate::convolution::{Convolver, KernelSpectrum};
use crate::kernel::{Kernel, KernelShape};
use crate::lattice::Lattice;

/// Fixed-length series with the newest value at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    values: VecDeque<f32>,
    capacity: usize,
}

impl MetricSeries {
    /// Series of `capacity` zeros.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            values: std::iter::repeat_n(0.0, capacity).collect(),
            capacity,
        }
    }

    /// Push `value` at the front, discarding the oldest sample.
    pub fn push(&mut self, value: f32) {
        self.values.push_front(value);
        self.values.truncate(self.capacity);
    }

    #[must_use]
    pub fn latest(&self) -> Option<f32> {
        self.values.front().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values from newest to oldest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f32> + '_ {
        self.values.iter().copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }

    /// Largest finite value in the series, or `0.0`.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.iter()
            .filter(|value| value.is_finite())
            .fold(0.0_f32, f32::max)
    }
}

/// Which series a graph or report reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    /// `log2(sum(|next - current|) + 1)`.
    #[default]
    Derivative,
    /// Sum of the blurred derivative field.
    SmoothedDerivative,
}

impl MetricSource {
    pub const ALL: [Self; 2] = [Self::Derivative, Self::SmoothedDerivative];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Derivative => "derivative",
            Self::SmoothedDerivative => "smoothed_derivative",
        }
    }
}

/// Scalars recorded for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub derivative: f32,
    pub smoothed: f32,
}

/// Blur kernel approximating a Gaussian of standard deviation `sigma`,
/// clipped to the largest odd size that fits the lattice.
pub(crate) fn derivative_blur_kernel(
    sigma: f32,
    width: usize,
    height: usize,
) -> Result<Kernel, SimulationError> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(SimulationError::InvalidConfig(
            "derivative_blur_sigma must be positive",
        ));
    }
    let spread = 2.0 * sigma * sigma;
    if !spread.is_finite() {
        return Err(SimulationError::InvalidConfig(
            "derivative_blur_sigma is too large",
        ));
    }
    let limit = width.min(height);
    let fit = if limit % 2 == 1 { limit } else { limit - 1 };
    let wanted = 2.0 * (3.0 * f64::from(sigma)).ceil() + 1.0;
    let size = if wanted >= fit as f64 {
        fit
    } else {
        wanted as usize
    };
    Ok(Kernel::from_shape(&KernelShape::Gaussian {
        size: size.max(1),
        mu: None,
        sigma: spread,
    })?)
}

/// Derivative fields plus their rolling series.
#[derive(Debug, Clone)]
pub struct MetricTracker {
    blur: KernelSpectrum,
    derivative: Lattice,
    smoothed: Lattice,
    derivative_series: MetricSeries,
    smoothed_series: MetricSeries,
}

impl MetricTracker {
    pub fn new(
        convolver: &Convolver,
        history: usize,
        blur_sigma: f32,
    ) -> Result<Self, SimulationError> {
        if history == 0 {
            return Err(SimulationError::InvalidConfig(
                "metric_history must be non-zero",
            ));
        }
        let (width, height) = (convolver.width(), convolver.height());
        let kernel = derivative_blur_kernel(blur_sigma, width, height)?;
        Ok(Self {
            blur: convolver.kernel_spectrum(&kernel)?,
            derivative: Lattice::new(width, height, 0.0)?,
            smoothed: Lattice::new(width, height, 0.0)?,
            derivative_series: MetricSeries::new(history),
            smoothed_series: MetricSeries::new(history),
        })
    }

    /// Record the change from `current` to `next`.
    pub fn record(&mut self, convolver: &Convolver, next: &Lattice, current: &Lattice) -> MetricSample {
        for ((out, &n), &c) in self
            .derivative
            .cells_mut()
            .iter_mut()
            .zip(next.cells())
            .zip(current.cells())
        {
            *out = (n - c).abs();
        }
        self.smoothed = convolver.density(&self.derivative, &self.blur);

        let sample = MetricSample {
            derivative: (self.derivative.sum() + 1.0).log2() as f32,
            smoothed: self.smoothed.sum() as f32,
        };
        self.derivative_series.push(sample.derivative);
        self.smoothed_series.push(sample.smoothed);
        sample
    }

    #[must_use]
    pub fn series(&self, source: MetricSource) -> &MetricSeries {
        match source {
            MetricSource::Derivative => &self.derivative_series,
            MetricSource::SmoothedDerivative => &self.smoothed_series,
        }
    }

    /// `|next - current|` from the last recorded tick.
    #[must_use]
    pub const fn derivative_field(&self) -> &Lattice {
        &self.derivative
    }

    /// Blurred derivative from the last recorded tick.
    #[must_use]
    pub const fn smoothed_field(&self) -> &Lattice {
        &self.smoothed
    }

    /// Size of the blur kernel actually used.
    #[must_use]
    pub const fn blur_size(&self) -> usize {
        self.blur.size()
    }
}
