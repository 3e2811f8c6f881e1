//! Row-major scalar lattice shared by the simulation, display and metric buffers.

use serde::{Deserialize, Serialize};

use crate::SimulationError;

/// 2D grid of floating-point cells with fixed dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    width: usize,
    height: usize,
    cells: Vec<f32>,
}

impl Lattice {
    /// Construct a lattice with `width * height` cells initialised to `initial`.
    pub fn new(width: usize, height: usize, initial: f32) -> Result<Self, SimulationError> {
        if width == 0 || height == 0 {
            return Err(SimulationError::InvalidConfig(
                "lattice dimensions must be non-zero",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: vec![initial; width * height],
        })
    }

    /// Wrap an existing row-major cell buffer.
    pub fn from_cells(
        width: usize,
        height: usize,
        cells: Vec<f32>,
    ) -> Result<Self, SimulationError> {
        if width == 0 || height == 0 {
            return Err(SimulationError::InvalidConfig(
                "lattice dimensions must be non-zero",
            ));
        }
        if cells.len() != width * height {
            return Err(SimulationError::InvalidConfig(
                "cell buffer length must equal width * height",
            ));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Wrap a buffer whose shape is already known to be consistent.
    pub(crate) fn from_raw(width: usize, height: usize, cells: Vec<f32>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
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

    /// Number of cells in the lattice.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    #[must_use]
    pub fn cells_mut(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    /// Returns the flat index for `(x, y)` without bounds checks.
    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Immutable access to a specific cell.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.cells[self.offset(x, y)])
        } else {
            None
        }
    }

    /// Mutable access to a specific cell.
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut f32> {
        if x < self.width && y < self.height {
            let idx = self.offset(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Fills the lattice with the provided scalar value.
    pub fn fill(&mut self, value: f32) {
        self.cells.fill(value);
    }

    /// Writes `value` into the half-open rectangle `[x0, x1) x [y0, y1)`.
    ///
    /// Corners may lie outside the lattice; the rectangle is clipped to the
    /// bounds and never wraps. Returns the number of cells written.
    pub fn fill_region(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, value: f32) -> usize {
        let clip = |v: isize, max: usize| v.clamp(0, max as isize) as usize;
        let (x0, x1) = (clip(x0, self.width), clip(x1, self.width));
        let (y0, y1) = (clip(y0, self.height), clip(y1, self.height));
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }
        for y in y0..y1 {
            let row = self.offset(0, y);
            self.cells[row + x0..row + x1].fill(value);
        }
        (x1 - x0) * (y1 - y0)
    }

    /// Sum of all cells, accumulated in double precision.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.cells.iter().map(|&cell| f64::from(cell)).sum()
    }

    /// Mean cell value.
    #[must_use]
    pub fn mean(&self) -> f32 {
        (self.sum() / self.cells.len() as f64) as f32
    }

    /// Largest cell value, or `0.0` when every cell is non-finite.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.cells
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .fold(0.0_f32, f32::max)
    }
}
