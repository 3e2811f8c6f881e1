//! RGBA pixel buffer and integer rectangles.

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    /// Opaque gray for `value` in `[0, 1]`; out-of-range values saturate.
    #[must_use]
    pub fn gray(value: f32) -> Self {
        let level = if value.is_nan() {
            0
        } else {
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        Self([level, level, level, 255])
    }
}

/// Axis-aligned rectangle in pixel coordinates. May extend past a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[must_use]
    pub const fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    #[must_use]
    pub const fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    #[must_use]
    pub fn contains(&self, px: i64, py: i64) -> bool {
        px >= i64::from(self.x) && px < self.right() && py >= i64::from(self.y) && py < self.bottom()
    }

    /// Overlap of two rectangles, or `None` when they do not intersect.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x0 = i64::from(self.x).max(i64::from(other.x));
        let y0 = i64::from(self.y).max(i64::from(other.y));
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(Self::new(
            x0 as i32,
            y0 as i32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        ))
    }
}

/// Row-major RGBA canvas drawables render into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl PixelBuffer {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::TRANSPARENT)
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        Bounds::new(0, 0, self.width, self.height)
    }

    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Flat RGBA bytes, suitable for uploading as a texture.
    #[must_use]
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|color| color.0).collect()
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Option<Color> {
        self.index(x, y).map(|idx| self.pixels[idx])
    }

    /// Write one pixel; coordinates outside the buffer are ignored.
    pub fn set(&mut self, x: i64, y: i64, color: Color) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = color;
        }
    }

    /// Fill `rect` clipped to the buffer.
    pub fn fill_rect(&mut self, rect: Bounds, color: Color) {
        let Some(clipped) = rect.intersect(&self.bounds()) else {
            return;
        };
        let width = self.width as usize;
        for y in clipped.y as usize..clipped.bottom() as usize {
            let row = y * width;
            self.pixels[row + clipped.x as usize..row + clipped.right() as usize].fill(color);
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}
