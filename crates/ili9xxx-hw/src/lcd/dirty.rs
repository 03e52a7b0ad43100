//! Bounding box of pixels modified since the last flush.

/// Inclusive dirty rectangle.
///
/// The empty state is `x_low = width, y_low = height, x_high = 0, y_high = 0`,
/// so `x_high < x_low` holds whenever nothing needs drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    x_low: u16,
    y_low: u16,
    x_high: u16,
    y_high: u16,
    width: u16,
    height: u16,
}

impl DirtyRegion {
    /// Creates an empty region for a `width` x `height` panel.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            x_low: width,
            y_low: height,
            x_high: 0,
            y_high: 0,
            width,
            height,
        }
    }

    /// Returns to the empty sentinel.
    pub fn reset(&mut self) {
        *self = Self::new(self.width, self.height);
    }

    /// Marks the whole panel dirty.
    pub fn mark_all(&mut self) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        self.x_low = 0;
        self.y_low = 0;
        self.x_high = self.width - 1;
        self.y_high = self.height - 1;
    }

    /// Grows the box to include `(x, y)`.
    #[inline]
    pub fn on_pixel_changed(&mut self, x: u16, y: u16) {
        if x < self.x_low {
            self.x_low = x;
        }
        if y < self.y_low {
            self.y_low = y;
        }
        if x > self.x_high {
            self.x_high = x;
        }
        if y > self.y_high {
            self.y_high = y;
        }
    }

    /// Returns true if nothing needs drawing.
    pub fn is_empty(&self) -> bool {
        self.x_high < self.x_low || self.y_high < self.y_low
    }

    /// `(x_low, y_low, x_high, y_high)`, or `None` when empty.
    pub fn bounds(&self) -> Option<(u16, u16, u16, u16)> {
        if self.is_empty() {
            None
        } else {
            Some((self.x_low, self.y_low, self.x_high, self.y_high))
        }
    }

    /// Width of the dirty box in pixels (0 when empty).
    pub fn width(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.x_high - self.x_low) as usize + 1
        }
    }

    /// Height of the dirty box in pixels (0 when empty).
    pub fn height(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.y_high - self.y_low) as usize + 1
        }
    }

    /// Leftmost dirty column.
    pub fn x_low(&self) -> u16 {
        self.x_low
    }

    /// Topmost dirty row.
    pub fn y_low(&self) -> u16 {
        self.y_low
    }

    /// Rightmost dirty column.
    pub fn x_high(&self) -> u16 {
        self.x_high
    }

    /// Bottom dirty row.
    pub fn y_high(&self) -> u16 {
        self.y_high
    }
}
