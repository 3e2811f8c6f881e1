//! Letterboxed mapping between a drawable's bounds and the grid it shows.

use crate::buffer::Bounds;

/// Uniform scale plus centering pad that fits a `content` grid inside `bounds`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewLayout {
    pub origin: (f32, f32),
    pub scale: f32,
    pub pad: (f32, f32),
    pub content_size: (f32, f32),
    pub render_size: (f32, f32),
}

impl ViewLayout {
    /// Fit `content_size` cells into `bounds`, preserving aspect ratio.
    #[must_use]
    pub fn fit(bounds: Bounds, content_size: (usize, usize)) -> Self {
        let canvas_w = bounds.width.max(1) as f32;
        let canvas_h = bounds.height.max(1) as f32;
        let content_w = content_size.0.max(1) as f32;
        let content_h = content_size.1.max(1) as f32;
        let scale = (canvas_w / content_w).min(canvas_h / content_h);
        let render_size = (content_w * scale, content_h * scale);
        Self {
            origin: (bounds.x as f32, bounds.y as f32),
            scale,
            pad: (
                (canvas_w - render_size.0) * 0.5,
                (canvas_h - render_size.1) * 0.5,
            ),
            content_size: (content_w, content_h),
            render_size,
        }
    }

    /// Pixel-space rectangle covered by the content.
    #[must_use]
    pub fn content_bounds(&self) -> Bounds {
        Bounds::new(
            (self.origin.0 + self.pad.0).floor() as i32,
            (self.origin.1 + self.pad.1).floor() as i32,
            self.render_size.0.round() as u32,
            self.render_size.1.round() as u32,
        )
    }

    /// Content coordinates under the pixel `(px, py)`, or `None` in the letterbox.
    #[must_use]
    pub fn screen_to_content(&self, px: f32, py: f32) -> Option<(f32, f32)> {
        if self.scale <= f32::EPSILON {
            return None;
        }
        let cx = (px - self.origin.0 - self.pad.0) / self.scale;
        let cy = (py - self.origin.1 - self.pad.1) / self.scale;
        if !cx.is_finite() || !cy.is_finite() {
            return None;
        }
        if cx < 0.0 || cy < 0.0 || cx >= self.content_size.0 || cy >= self.content_size.1 {
            return None;
        }
        Some((cx, cy))
    }

    /// Pixel position of content coordinates.
    #[must_use]
    pub fn content_to_screen(&self, cx: f32, cy: f32) -> (f32, f32) {
        (
            self.origin.0 + self.pad.0 + cx * self.scale,
            self.origin.1 + self.pad.1 + cy * self.scale,
        )
    }

    /// Normalized `[0, 1)` content coordinates under a pixel, as brushes expect.
    #[must_use]
    pub fn screen_to_normalized(&self, px: f32, py: f32) -> Option<(f32, f32)> {
        self.screen_to_content(px, py)
            .map(|(cx, cy)| (cx / self.content_size.0, cy / self.content_size.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_canvas_pads_horizontally() {
        let layout = ViewLayout::fit(Bounds::new(10, 0, 300, 100), (64, 64));
        assert!((layout.scale - 100.0 / 64.0).abs() < 1e-6);
        assert!((layout.pad.0 - 100.0).abs() < 1e-4);
        assert_eq!(layout.pad.1, 0.0);
        assert_eq!(layout.content_bounds(), Bounds::new(110, 0, 100, 100));
    }

    #[test]
    fn screen_mapping_round_trips_and_rejects_letterbox() {
        let layout = ViewLayout::fit(Bounds::new(0, 0, 200, 100), (20, 10));
        assert_eq!(layout.scale, 10.0);
        let (sx, sy) = layout.content_to_screen(3.5, 7.25);
        let (cx, cy) = layout.screen_to_content(sx, sy).expect("inside");
        assert!((cx - 3.5).abs() < 1e-4 && (cy - 7.25).abs() < 1e-4);
        assert!(layout.screen_to_content(-1.0, 5.0).is_none());
        assert!(layout.screen_to_content(200.0, 5.0).is_none());
        let (nx, ny) = layout.screen_to_normalized(100.0, 50.0).expect("center");
        assert!((nx - 0.5).abs() < 1e-6 && (ny - 0.5).abs() < 1e-6);
    }
}
