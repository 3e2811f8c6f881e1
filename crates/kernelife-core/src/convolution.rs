//! Toroidal convolution through 2D FFTs.
//!
//! A lattice is transformed once per tick into a [`LatticeSpectrum`]; every
//! kernel keeps a [`KernelSpectrum`] padded to the lattice shape. Multiplying
//! the two and transforming back yields a circular convolution, which is then
//! rolled by half the kernel extent so that the kernel center lines up with
//! the sample point.

use std::fmt;
use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::kernel::{Kernel, KernelError};
use crate::lattice::Lattice;

/// Frequency-domain view of a lattice.
#[derive(Debug, Clone)]
pub struct LatticeSpectrum {
    width: usize,
    height: usize,
    bins: Vec<Complex32>,
}

impl LatticeSpectrum {
    #[must_use]
    pub fn bins(&self) -> &[Complex32] {
        &self.bins
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }
}

/// Cached transform of a kernel zero-padded to the lattice shape.
#[derive(Debug, Clone)]
pub struct KernelSpectrum {
    size: usize,
    sum: f32,
    bins: Vec<Complex32>,
}

impl KernelSpectrum {
    /// Edge length of the source kernel.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Weight sum of the source kernel, used for density normalization.
    #[must_use]
    pub const fn sum(&self) -> f32 {
        self.sum
    }
}

/// FFT plans for one lattice shape.
#[derive(Clone)]
pub struct Convolver {
    width: usize,
    height: usize,
    row_forward: Arc<dyn Fft<f32>>,
    row_inverse: Arc<dyn Fft<f32>>,
    col_forward: Arc<dyn Fft<f32>>,
    col_inverse: Arc<dyn Fft<f32>>,
}

impl fmt::Debug for Convolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Convolver")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Convolver {
    /// Plan forward and inverse transforms for a `width x height` lattice.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            width,
            height,
            row_forward: planner.plan_fft_forward(width),
            row_inverse: planner.plan_fft_inverse(width),
            col_forward: planner.plan_fft_forward(height),
            col_inverse: planner.plan_fft_inverse(height),
        }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Forward transform of `lattice`.
    ///
    /// # Panics
    /// If the lattice shape differs from the planned shape.
    #[must_use]
    pub fn transform(&self, lattice: &Lattice) -> LatticeSpectrum {
        assert_eq!(
            (lattice.width(), lattice.height()),
            (self.width, self.height),
            "lattice shape does not match convolver plan"
        );
        let mut bins: Vec<Complex32> = lattice
            .cells()
            .iter()
            .map(|&value| Complex32::new(value, 0.0))
            .collect();
        self.forward_2d(&mut bins);
        LatticeSpectrum {
            width: self.width,
            height: self.height,
            bins,
        }
    }

    /// Pad `kernel` with its top-left corner at the origin and transform it.
    pub fn kernel_spectrum(&self, kernel: &Kernel) -> Result<KernelSpectrum, KernelError> {
        kernel.check_fits(self.width, self.height)?;
        let size = kernel.size();
        let mut bins = vec![Complex32::default(); self.width * self.height];
        for (ky, row) in kernel.weights().chunks_exact(size).enumerate() {
            for (kx, &weight) in row.iter().enumerate() {
                bins[ky * self.width + kx] = Complex32::new(weight, 0.0);
            }
        }
        self.forward_2d(&mut bins);
        Ok(KernelSpectrum {
            size,
            sum: kernel.sum(),
            bins,
        })
    }

    /// Unnormalized centered response of `kernel` over the transformed lattice.
    #[must_use]
    pub fn convolve_spectrum(&self, lattice: &LatticeSpectrum, kernel: &KernelSpectrum) -> Vec<f32> {
        debug_assert_eq!(lattice.bins.len(), kernel.bins.len());
        let mut product: Vec<Complex32> = lattice
            .bins
            .iter()
            .zip(&kernel.bins)
            .map(|(a, b)| a * b)
            .collect();
        self.inverse_2d(&mut product);

        // Undo the half-kernel offset introduced by the corner-anchored padding.
        let shift = kernel.size / 2;
        let mut out = vec![0.0_f32; product.len()];
        for y in 0..self.height {
            let src_row = ((y + shift) % self.height) * self.width;
            let dst_row = y * self.width;
            for x in 0..self.width {
                out[dst_row + x] = product[src_row + (x + shift) % self.width].re;
            }
        }
        out
    }

    /// Response divided by the kernel weight sum: a local weighted average.
    #[must_use]
    pub fn density_spectrum(&self, lattice: &LatticeSpectrum, kernel: &KernelSpectrum) -> Vec<f32> {
        let inv_sum = 1.0 / kernel.sum;
        let mut out = self.convolve_spectrum(lattice, kernel);
        for value in &mut out {
            *value *= inv_sum;
        }
        out
    }

    /// Unnormalized circular convolution of `lattice` with `kernel`.
    #[must_use]
    pub fn convolve(&self, lattice: &Lattice, kernel: &KernelSpectrum) -> Lattice {
        let cells = self.convolve_spectrum(&self.transform(lattice), kernel);
        self.wrap(cells)
    }

    /// Normalized circular convolution of `lattice` with `kernel`.
    #[must_use]
    pub fn density(&self, lattice: &Lattice, kernel: &KernelSpectrum) -> Lattice {
        let cells = self.density_spectrum(&self.transform(lattice), kernel);
        self.wrap(cells)
    }

    fn wrap(&self, cells: Vec<f32>) -> Lattice {
        Lattice::from_raw(self.width, self.height, cells)
    }

    fn forward_2d(&self, buffer: &mut [Complex32]) {
        self.row_forward.process(buffer);
        self.process_columns(buffer, self.col_forward.as_ref());
    }

    fn inverse_2d(&self, buffer: &mut [Complex32]) {
        self.row_inverse.process(buffer);
        self.process_columns(buffer, self.col_inverse.as_ref());
        let scale = 1.0 / (self.width * self.height) as f32;
        for value in buffer.iter_mut() {
            *value *= scale;
        }
    }

    fn process_columns(&self, buffer: &mut [Complex32], fft: &dyn Fft<f32>) {
        let (w, h) = (self.width, self.height);
        let mut columns = vec![Complex32::default(); buffer.len()];
        for y in 0..h {
            for x in 0..w {
                columns[x * h + y] = buffer[y * w + x];
            }
        }
        fft.process(&mut columns);
        for x in 0..w {
            for y in 0..h {
                buffer[y * w + x] = columns[x * h + y];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelShape;

    fn naive_circular(lattice: &Lattice, kernel: &Kernel) -> Vec<f32> {
        let (w, h) = (lattice.width() as isize, lattice.height() as isize);
        let c = kernel.center() as isize;
        let mut out = vec![0.0; lattice.len()];
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for ky in 0..kernel.size() as isize {
                    for kx in 0..kernel.size() as isize {
                        let sx = (x - (kx - c)).rem_euclid(w) as usize;
                        let sy = (y - (ky - c)).rem_euclid(h) as usize;
                        acc += kernel.get(kx as usize, ky as usize).expect("weight")
                            * lattice.get(sx, sy).expect("cell");
                    }
                }
                out[(y * w + x) as usize] = acc;
            }
        }
        out
    }

    #[test]
    fn fft_matches_naive_circular_convolution() {
        let (w, h) = (12, 9);
        let cells: Vec<f32> = (0..w * h).map(|i| ((i * 7919) % 13) as f32 / 13.0).collect();
        let lattice = Lattice::from_cells(w, h, cells).expect("lattice");
        let kernel = Kernel::from_weights(
            5,
            (0..25).map(|i| (i % 4) as f32 + 0.25).collect(),
        )
        .expect("kernel");
        let convolver = Convolver::new(w, h);
        let spectrum = convolver.kernel_spectrum(&kernel).expect("spectrum");
        let fast = convolver.convolve(&lattice, &spectrum);
        let slow = naive_circular(&lattice, &kernel);
        for (a, b) in fast.cells().iter().zip(&slow) {
            assert!((a - b).abs() < 1e-3, "fft {a} vs naive {b}");
        }
    }

    #[test]
    fn kernel_spectrum_rejects_oversized_kernel() {
        let convolver = Convolver::new(4, 8);
        let kernel = Kernel::from_shape(&KernelShape::Moore { size: 5 }).expect("kernel");
        assert!(matches!(
            convolver.kernel_spectrum(&kernel),
            Err(KernelError::TooLarge { .. })
        ));
    }

    #[test]
    fn density_divides_by_weight_sum() {
        let lattice = Lattice::new(6, 6, 1.0).expect("lattice");
        let kernel = Kernel::from_shape(&KernelShape::Moore { size: 3 }).expect("kernel");
        let convolver = Convolver::new(6, 6);
        let spectrum = convolver.kernel_spectrum(&kernel).expect("spectrum");
        assert_eq!(spectrum.sum(), 8.0);
        let raw = convolver.convolve(&lattice, &spectrum);
        let density = convolver.density(&lattice, &spectrum);
        assert!(raw.cells().iter().all(|&v| (v - 8.0).abs() < 1e-4));
        assert!(density.cells().iter().all(|&v| (v - 1.0).abs() < 1e-5));
    }
}
