//! Coordinates, sizes and rectangles in virtual screen space.
//!
//! Two spaces share these types: pixels (what the display server positions
//! controllers in) and millimetres (what the server reports as the physical
//! size of the virtual screen).  The primary monitor's top-left corner is the
//! origin of both; monitors placed to the left or above it have negative
//! coordinates.

use serde::{Deserialize, Serialize};

/// A position in virtual pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// The virtual origin, where the primary monitor is anchored.
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height of an area, in either pixels or millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u64,
    pub height: u64,
}

impl Dimensions {
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle.  `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u64,
    pub height: u64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: u64, height: u64) -> Self {
        Self { x, y, width, height }
    }

    /// Returns the rightmost X coordinate (exclusive).
    pub fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    /// Returns the bottommost Y coordinate (exclusive).
    pub fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Returns the smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, (right - x) as u64, (bottom - y) as u64)
    }
}

/// How a neighbour is aligned on the axis perpendicular to its wing.
///
/// For a right or left neighbour this picks its `y`; for a top or bottom
/// neighbour it picks its `x`.  `Start` aligns top (or left) edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    #[default]
    Start,
    Center,
    End,
}

impl Alignment {
    /// Offset of a span of length `len` placed against an anchor span that
    /// starts at `base` and is `anchor_len` long.
    pub fn offset(self, base: i64, anchor_len: u64, len: u64) -> i64 {
        let slack = anchor_len as i64 - len as i64;
        match self {
            Alignment::Start => base,
            Alignment::Center => base + slack / 2,
            Alignment::End => base + slack,
        }
    }
}
