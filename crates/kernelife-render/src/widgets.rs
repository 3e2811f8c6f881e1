//! Drawables for lattices, metric series and kernels.

use kernelife_core::{Kernel, Lattice, MetricSeries};

use crate::Drawable;
use crate::buffer::{Bounds, Color, PixelBuffer};
use crate::layout::ViewLayout;

/// Pixels of `bounds` that are also inside `buffer`.
fn visible(bounds: Bounds, buffer: &PixelBuffer) -> Option<Bounds> {
    bounds.intersect(&buffer.bounds())
}

/// Paint every visible pixel of the fitted grid with `shade(cx, cy)`.
fn paint_grid(
    bounds: Bounds,
    grid: (usize, usize),
    buffer: &mut PixelBuffer,
    shade: impl Fn(usize, usize) -> Color,
) {
    let layout = ViewLayout::fit(bounds, grid);
    let Some(area) = layout
        .content_bounds()
        .intersect(&bounds)
        .and_then(|content| visible(content, buffer))
    else {
        return;
    };
    for py in i64::from(area.y)..area.bottom() {
        for px in i64::from(area.x)..area.right() {
            if let Some((cx, cy)) = layout.screen_to_content(px as f32 + 0.5, py as f32 + 0.5) {
                let (cx, cy) = ((cx as usize).min(grid.0 - 1), (cy as usize).min(grid.1 - 1));
                buffer.set(px, py, shade(cx, cy));
            }
        }
    }
}

/// Grayscale view of a lattice, letterboxed into its bounds.
#[derive(Debug, Clone, Copy)]
pub struct LatticeView<'a> {
    lattice: &'a Lattice,
    bounds: Bounds,
    background: Color,
}

impl<'a> LatticeView<'a> {
    #[must_use]
    pub const fn new(lattice: &'a Lattice, bounds: Bounds) -> Self {
        Self {
            lattice,
            bounds,
            background: Color::BLACK,
        }
    }

    #[must_use]
    pub const fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Layout used to place the lattice, for mapping pointer input.
    #[must_use]
    pub fn layout(&self) -> ViewLayout {
        ViewLayout::fit(self.bounds, (self.lattice.width(), self.lattice.height()))
    }
}

impl Drawable for LatticeView<'_> {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn render_into(&self, buffer: &mut PixelBuffer) {
        buffer.fill_rect(self.bounds, self.background);
        let lattice = self.lattice;
        paint_grid(
            self.bounds,
            (lattice.width(), lattice.height()),
            buffer,
            |x, y| Color::gray(lattice.get(x, y).unwrap_or(0.0)),
        );
    }
}

/// Polyline of a metric series with the newest sample on the right edge.
#[derive(Debug, Clone, Copy)]
pub struct SeriesGraph<'a> {
    series: &'a MetricSeries,
    bounds: Bounds,
    color: Color,
    background: Option<Color>,
    ceiling: Option<f32>,
}

impl<'a> SeriesGraph<'a> {
    #[must_use]
    pub const fn new(series: &'a MetricSeries, bounds: Bounds) -> Self {
        Self {
            series,
            bounds,
            color: Color::WHITE,
            background: None,
            ceiling: None,
        }
    }

    #[must_use]
    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub const fn with_background(mut self, background: Color) -> Self {
        self.background = Some(background);
        self
    }

    /// Fixed value mapped to the top edge instead of the series maximum.
    #[must_use]
    pub const fn with_ceiling(mut self, ceiling: f32) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    fn point(&self, index: usize, value: f32, ceiling: f32) -> (i64, i64) {
        let span_x = f64::from(self.bounds.width.saturating_sub(1));
        let span_y = f64::from(self.bounds.height.saturating_sub(1));
        let steps = self.series.len().saturating_sub(1).max(1) as f64;
        let x = self.bounds.right() - 1 - (index as f64 * span_x / steps).round() as i64;
        let level = if value.is_finite() {
            f64::from((value / ceiling).clamp(0.0, 1.0))
        } else {
            0.0
        };
        let y = self.bounds.bottom() - 1 - (level * span_y).round() as i64;
        (x, y)
    }
}

impl Drawable for SeriesGraph<'_> {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn render_into(&self, buffer: &mut PixelBuffer) {
        if let Some(background) = self.background {
            buffer.fill_rect(self.bounds, background);
        }
        if self.bounds.is_empty() || self.series.is_empty() {
            return;
        }
        let ceiling = match self.ceiling {
            Some(value) if value > 0.0 => value,
            _ => {
                let max = self.series.max();
                if max > 0.0 { max } else { 1.0 }
            }
        };
        let points: Vec<(i64, i64)> = self
            .series
            .iter()
            .enumerate()
            .map(|(index, value)| self.point(index, value, ceiling))
            .collect();
        if let [only] = points.as_slice() {
            plot(buffer, self.bounds, *only, self.color);
        }
        for pair in points.windows(2) {
            draw_line(buffer, self.bounds, pair[0], pair[1], self.color);
        }
    }
}

fn plot(buffer: &mut PixelBuffer, clip: Bounds, (x, y): (i64, i64), color: Color) {
    if clip.contains(x, y) {
        buffer.set(x, y, color);
    }
}

/// Bresenham line clipped to `clip` and the buffer.
fn draw_line(
    buffer: &mut PixelBuffer,
    clip: Bounds,
    (mut x0, mut y0): (i64, i64),
    (x1, y1): (i64, i64),
    color: Color,
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        plot(buffer, clip, (x0, y0), color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Kernel weights shaded relative to the largest weight.
#[derive(Debug, Clone, Copy)]
pub struct KernelPainter<'a> {
    kernel: &'a Kernel,
    bounds: Bounds,
}

impl<'a> KernelPainter<'a> {
    #[must_use]
    pub const fn new(kernel: &'a Kernel, bounds: Bounds) -> Self {
        Self { kernel, bounds }
    }

    /// Kernel cell under a pixel, for editing weights with a pointer.
    #[must_use]
    pub fn cell_at(&self, px: f32, py: f32) -> Option<(usize, usize)> {
        let size = self.kernel.size();
        ViewLayout::fit(self.bounds, (size, size))
            .screen_to_content(px, py)
            .map(|(cx, cy)| ((cx as usize).min(size - 1), (cy as usize).min(size - 1)))
    }
}

impl Drawable for KernelPainter<'_> {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn render_into(&self, buffer: &mut PixelBuffer) {
        let kernel = self.kernel;
        let max = kernel.weights().iter().copied().fold(0.0_f32, f32::max);
        let scale = if max > 0.0 { 1.0 / max } else { 0.0 };
        paint_grid(
            self.bounds,
            (kernel.size(), kernel.size()),
            buffer,
            |x, y| Color::gray(kernel.get(x, y).unwrap_or(0.0) * scale),
        );
    }
}
