//! CPU rendering layer for Kernelife.
//!
//! Each widget draws itself into a [`PixelBuffer`] inside its own bounds and
//! clips to both those bounds and the buffer. Windowing, textures and input
//! dispatch stay with the host application.

use tracing::trace;

pub mod buffer;
pub mod layout;
pub mod widgets;

pub use buffer::{Bounds, Color, PixelBuffer};
pub use layout::ViewLayout;
pub use widgets::{KernelPainter, LatticeView, SeriesGraph};

/// Something that can paint itself into a pixel buffer.
pub trait Drawable {
    /// Region this drawable owns; it never writes outside it.
    fn bounds(&self) -> Bounds;

    fn render_into(&self, buffer: &mut PixelBuffer);
}

/// Render `drawables` in order, later ones painting over earlier ones.
pub fn render_all(buffer: &mut PixelBuffer, drawables: &[&dyn Drawable]) {
    for drawable in drawables {
        let bounds = drawable.bounds();
        if bounds.intersect(&buffer.bounds()).is_none() {
            trace!(?bounds, "drawable outside buffer; skipped");
            continue;
        }
        drawable.render_into(buffer);
    }
}
