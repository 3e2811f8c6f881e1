//! Neighborhood kernels: shapes, validation and weight grids.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or editing kernels.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum KernelError {
    #[error("kernel size {0} must be odd and non-zero")]
    EvenSize(usize),
    #[error("kernel size {size} does not fit a {width}x{height} lattice")]
    TooLarge {
        size: usize,
        width: usize,
        height: usize,
    },
    #[error("{name} must be positive and finite, got {value}")]
    NonPositiveParameter { name: &'static str, value: f32 },
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidParameter { name: &'static str, value: f32 },
    #[error("weight {index} is negative or non-finite ({value})")]
    InvalidWeight { index: usize, value: f32 },
    #[error("expected {expected} weights for a {size}x{size} kernel, got {actual}")]
    WeightCount {
        size: usize,
        expected: usize,
        actual: usize,
    },
    #[error("kernel weight sum is zero or out of range; density normalization is undefined")]
    DegenerateSum,
    #[error("cell ({x}, {y}) lies outside a {size}x{size} kernel")]
    OutOfBounds { x: usize, y: usize, size: usize },
    #[error("no kernel slot {0}")]
    UnknownSlot(usize),
    #[error("kernel gain must be finite, got {0}")]
    InvalidGain(f32),
}

/// Declarative description of a kernel, serialisable as part of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KernelShape {
    /// `exp(-(x-mu)^2/sigma - (y-mu)^2/sigma)`, peak normalised to 1.
    Gaussian {
        size: usize,
        /// Falloff origin along both axes; the kernel center when absent.
        #[serde(default)]
        mu: Option<f32>,
        sigma: f32,
    },
    /// Raised ring `exp(-(dist - radius)^2/sigma)` around the center.
    Ring { size: usize, radius: f32, sigma: f32 },
    /// Concentric cosine bands `0.5 * (1 - cos(frequency * dist^2))`.
    CosineRing { size: usize, frequency: f32 },
    /// Top-left and bottom-right quadrants set to 1, the others 0, softened
    /// with a small Gaussian blur. The center row and column belong to the
    /// top-left quadrant.
    Checkerboard { size: usize, blur_sigma: f32 },
    /// All ones except the center cell (Game of Life neighbor count at size 3).
    Moore { size: usize },
    /// Explicit row-major weights.
    Custom { size: usize, weights: Vec<f32> },
}

impl KernelShape {
    /// Edge length of the kernel this shape produces.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Gaussian { size, .. }
            | Self::Ring { size, .. }
            | Self::CosineRing { size, .. }
            | Self::Checkerboard { size, .. }
            | Self::Moore { size }
            | Self::Custom { size, .. } => *size,
        }
    }

    /// Short identifier used in logs and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Gaussian { .. } => "gaussian",
            Self::Ring { .. } => "ring",
            Self::CosineRing { .. } => "cosine_ring",
            Self::Checkerboard { .. } => "checkerboard",
            Self::Moore { .. } => "moore",
            Self::Custom { .. } => "custom",
        }
    }
}

impl Default for KernelShape {
    fn default() -> Self {
        Self::Ring {
            size: 33,
            radius: 2.0,
            sigma: 4.0,
        }
    }
}

fn require_odd(size: usize) -> Result<(), KernelError> {
    if size % 2 == 1 {
        Ok(())
    } else {
        Err(KernelError::EvenSize(size))
    }
}

fn require_positive(name: &'static str, value: f32) -> Result<(), KernelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KernelError::NonPositiveParameter { name, value })
    }
}

fn require_non_negative(name: &'static str, value: f32) -> Result<(), KernelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidParameter { name, value })
    }
}

/// Odd-sized square grid of non-negative weights with a positive sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawKernel", into = "RawKernel")]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
    sum: f32,
}

#[derive(Serialize, Deserialize)]
struct RawKernel {
    size: usize,
    weights: Vec<f32>,
}

impl TryFrom<RawKernel> for Kernel {
    type Error = KernelError;

    fn try_from(raw: RawKernel) -> Result<Self, Self::Error> {
        Kernel::from_weights(raw.size, raw.weights)
    }
}

impl From<Kernel> for RawKernel {
    fn from(kernel: Kernel) -> Self {
        Self {
            size: kernel.size,
            weights: kernel.weights,
        }
    }
}

impl Kernel {
    /// Build the weight grid described by `shape`.
    pub fn from_shape(shape: &KernelShape) -> Result<Self, KernelError> {
        let size = shape.size();
        require_odd(size)?;
        let center = (size / 2) as f32;
        let weights = match shape {
            KernelShape::Gaussian { mu, sigma, .. } => {
                require_positive("sigma", *sigma)?;
                let mu = mu.unwrap_or(center);
                if !mu.is_finite() {
                    return Err(KernelError::InvalidParameter {
                        name: "mu",
                        value: mu,
                    });
                }
                normalize_by_max(sample(size, |x, y| {
                    (-(x - mu).powi(2) / sigma - (y - mu).powi(2) / sigma).exp()
                }))?
            }
            KernelShape::Ring { radius, sigma, .. } => {
                require_positive("sigma", *sigma)?;
                require_non_negative("radius", *radius)?;
                normalize_by_max(sample(size, |x, y| {
                    let dist = (x - center).hypot(y - center);
                    (-(dist - radius).powi(2) / sigma).exp()
                }))?
            }
            KernelShape::CosineRing { frequency, .. } => {
                require_positive("frequency", *frequency)?;
                normalize_by_max(sample(size, |x, y| {
                    let dist_sq = (x - center).powi(2) + (y - center).powi(2);
                    0.5 * (1.0 - (frequency * dist_sq).cos())
                }))?
            }
            KernelShape::Checkerboard { blur_sigma, .. } => {
                require_positive("blur_sigma", *blur_sigma)?;
                let quadrants = sample(size, |x, y| {
                    if (x <= center) == (y <= center) {
                        1.0
                    } else {
                        0.0
                    }
                });
                normalize_by_max(blur(&quadrants, size, *blur_sigma))?
            }
            KernelShape::Moore { .. } => {
                let mut weights = vec![1.0; size * size];
                weights[(size / 2) * size + size / 2] = 0.0;
                weights
            }
            KernelShape::Custom { weights, .. } => weights.clone(),
        };
        Self::from_weights(size, weights)
    }

    /// Wrap explicit row-major weights, validating shape and values.
    pub fn from_weights(size: usize, weights: Vec<f32>) -> Result<Self, KernelError> {
        require_odd(size)?;
        let expected = size * size;
        if weights.len() != expected {
            return Err(KernelError::WeightCount {
                size,
                expected,
                actual: weights.len(),
            });
        }
        if let Some((index, &value)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(KernelError::InvalidWeight { index, value });
        }
        let sum = weights.iter().map(|&w| f64::from(w)).sum::<f64>() as f32;
        if !(sum.is_finite() && sum > 0.0 && sum.recip().is_finite()) {
            return Err(KernelError::DegenerateSum);
        }
        Ok(Self { size, weights, sum })
    }

    /// Single unit weight at the center.
    pub fn identity(size: usize) -> Result<Self, KernelError> {
        require_odd(size)?;
        let mut weights = vec![0.0; size * size];
        weights[(size / 2) * size + size / 2] = 1.0;
        Self::from_weights(size, weights)
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Index of the center row/column.
    #[must_use]
    pub const fn center(&self) -> usize {
        self.size / 2
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Sum of all weights; positive, finite and with a finite reciprocal.
    #[must_use]
    pub const fn sum(&self) -> f32 {
        self.sum
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.size && y < self.size).then(|| self.weights[y * self.size + x])
    }

    /// Copy of this kernel with one weight replaced.
    pub(crate) fn with_weight(&self, x: usize, y: usize, value: f32) -> Result<Self, KernelError> {
        if x >= self.size || y >= self.size {
            return Err(KernelError::OutOfBounds {
                x,
                y,
                size: self.size,
            });
        }
        let mut weights = self.weights.clone();
        weights[y * self.size + x] = value;
        Self::from_weights(self.size, weights)
    }

    /// Ensure this kernel fits a `width x height` lattice.
    pub fn check_fits(&self, width: usize, height: usize) -> Result<(), KernelError> {
        if self.size > width || self.size > height {
            return Err(KernelError::TooLarge {
                size: self.size,
                width,
                height,
            });
        }
        Ok(())
    }
}

fn sample(size: usize, f: impl Fn(f32, f32) -> f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            out.push(f(x as f32, y as f32));
        }
    }
    out
}

fn normalize_by_max(mut weights: Vec<f32>) -> Result<Vec<f32>, KernelError> {
    let max = weights.iter().copied().fold(0.0_f32, f32::max);
    if !(max.is_finite() && max > 0.0) {
        return Err(KernelError::DegenerateSum);
    }
    for weight in &mut weights {
        *weight /= max;
    }
    Ok(weights)
}

/// Separable Gaussian blur with zero padding outside the grid.
fn blur(grid: &[f32], size: usize, sigma: f32) -> Vec<f32> {
    let radius = (2.0 * sigma).ceil() as isize;
    let taps: Vec<f32> = (-radius..=radius)
        .map(|offset| (-((offset * offset) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let norm: f32 = taps.iter().sum();
    let pass = |input: &[f32], horizontal: bool| {
        let mut output = vec![0.0_f32; input.len()];
        for y in 0..size as isize {
            for x in 0..size as isize {
                let mut acc = 0.0;
                for (tap, offset) in taps.iter().zip(-radius..=radius) {
                    let (sx, sy) = if horizontal {
                        (x + offset, y)
                    } else {
                        (x, y + offset)
                    };
                    if (0..size as isize).contains(&sx) && (0..size as isize).contains(&sy) {
                        acc += tap * input[sy as usize * size + sx as usize];
                    }
                }
                output[y as usize * size + x as usize] = acc / norm;
            }
        }
        output
    };
    pass(&pass(grid, true), false)
}
