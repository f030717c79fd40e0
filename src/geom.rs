//! 2-D vector math for pixel-grid and continuous coordinates.
//!
//! [`IntPos`] is a position or size on a pixel grid, [`FloatPos`] is the same
//! in continuous coordinates. Both are plain `Copy` values: every operation
//! returns a new value.

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

// =============================================================================
// Integer Positions
// =============================================================================

/// Pixel-grid coordinate or size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntPos {
    pub x: i64,
    pub y: i64,
}

impl IntPos {
    pub const ZERO: IntPos = IntPos { x: 0, y: 0 };

    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Convert to continuous coordinates.
    #[inline]
    pub fn to_float(self) -> FloatPos {
        FloatPos::new(self.x as f64, self.y as f64)
    }

    /// `true` if any component is negative.
    #[inline]
    pub fn any_negative(self) -> bool {
        self.x < 0 || self.y < 0
    }

    /// `true` if any component of `self` is strictly greater than `other`'s.
    #[inline]
    pub fn any_greater(self, other: IntPos) -> bool {
        self.x > other.x || self.y > other.y
    }
}

impl Add for IntPos {
    type Output = IntPos;

    fn add(self, rhs: IntPos) -> IntPos {
        IntPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for IntPos {
    type Output = IntPos;

    fn sub(self, rhs: IntPos) -> IntPos {
        IntPos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(i64, i64)> for IntPos {
    fn from((x, y): (i64, i64)) -> Self {
        IntPos::new(x, y)
    }
}

// =============================================================================
// Float Positions
// =============================================================================

/// Continuous coordinate or size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloatPos {
    pub x: f64,
    pub y: f64,
}

impl FloatPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn floor(self) -> FloatPos {
        FloatPos::new(self.x.floor(), self.y.floor())
    }

    #[inline]
    pub fn ceil(self) -> FloatPos {
        FloatPos::new(self.x.ceil(), self.y.ceil())
    }

    /// Clamp both components into `[0, size]`.
    #[inline]
    pub fn clip_to_size(self, size: IntPos) -> FloatPos {
        FloatPos::new(
            self.x.max(0.0).min(size.x as f64),
            self.y.max(0.0).min(size.y as f64),
        )
    }

    /// Convert to the pixel grid, truncating toward zero.
    #[inline]
    pub fn to_int(self) -> IntPos {
        IntPos::new(self.x as i64, self.y as i64)
    }

    /// Add the same scalar to both components.
    #[inline]
    pub fn add_scalar(self, value: f64) -> FloatPos {
        FloatPos::new(self.x + value, self.y + value)
    }

    /// Subtract the same scalar from both components.
    #[inline]
    pub fn sub_scalar(self, value: f64) -> FloatPos {
        FloatPos::new(self.x - value, self.y - value)
    }
}

impl Add for FloatPos {
    type Output = FloatPos;

    fn add(self, rhs: FloatPos) -> FloatPos {
        FloatPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for FloatPos {
    type Output = FloatPos;

    fn sub(self, rhs: FloatPos) -> FloatPos {
        FloatPos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for FloatPos {
    type Output = FloatPos;

    fn mul(self, rhs: f64) -> FloatPos {
        FloatPos::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for FloatPos {
    type Output = FloatPos;

    fn div(self, rhs: f64) -> FloatPos {
        FloatPos::new(self.x / rhs, self.y / rhs)
    }
}

// =============================================================================
// Crop Box
// =============================================================================

/// Axis-aligned crop rectangle in continuous coordinates.
///
/// `x1 <= x2` and `y1 <= y2` are the caller's responsibility; the resampler
/// rejects boxes that violate them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CropBox {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box covering a whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    /// Box spanning `top_left` to `bottom_right`.
    pub fn from_corners(top_left: FloatPos, bottom_right: FloatPos) -> Self {
        Self::new(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

// =============================================================================
// Tests
// =============================================================================
