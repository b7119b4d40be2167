use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in geographic coordinates (lon = x, lat = y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl GeoBounds {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest bounds containing a single point.
    pub fn from_point(p: DVec2) -> Self {
        Self::new(p.x, p.y, p.x, p.y)
    }

    /// Grow to include `p`.
    pub fn expand(&mut self, p: DVec2) {
        self.x0 = self.x0.min(p.x);
        self.x1 = self.x1.max(p.x);
        self.y0 = self.y0.min(p.y);
        self.y1 = self.y1.max(p.y);
    }

    /// Overlap with `other`. May be empty (x0 > x1) if they do not overlap.
    pub fn intersect(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        }
    }

    /// Half-open containment: min edges inclusive, max edges exclusive.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Non-degenerate with finite edges.
    pub fn is_valid(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1].iter().all(|v| v.is_finite())
            && self.x0 < self.x1
            && self.y0 < self.y1
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Point at fractions `(a, b)`, where `(0, 0)` maps to `(x1, y1)` and
    /// `(1, 1)` maps to `(x0, y0)`.
    #[inline]
    pub fn mix(&self, a: f64, b: f64) -> DVec2 {
        DVec2::new(a * self.x0 + (1.0 - a) * self.x1, b * self.y0 + (1.0 - b) * self.y1)
    }
}
