//! Vector helpers on top of `glam::DVec2`.
//!
//! The same type carries geographic (lon, lat) pairs, screen positions and
//! wind velocities. Callers track which frame a value lives in.

use glam::DVec2;

/// Polar construction and length/angle helpers used by the field and particle code.
pub trait VectorExt: Sized {
    /// Build a vector from magnitude `r` and angle `theta` (radians).
    fn polar(r: f64, theta: f64) -> Self;

    /// Rescale to the given length. The zero vector is returned unchanged.
    fn with_length(self, length: f64) -> Self;

    /// Rotate to the given angle, keeping the current length.
    fn with_angle(self, theta: f64) -> Self;

    /// Angle in radians, measured from +x towards +y.
    fn angle(self) -> f64;
}

impl VectorExt for DVec2 {
    #[inline]
    fn polar(r: f64, theta: f64) -> Self {
        DVec2::new(r * theta.cos(), r * theta.sin())
    }

    #[inline]
    fn with_length(self, length: f64) -> Self {
        let current = self.length();
        if current == 0.0 {
            return self;
        }
        self * (length / current)
    }

    #[inline]
    fn with_angle(self, theta: f64) -> Self {
        DVec2::polar(self.length(), theta)
    }

    #[inline]
    fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn polar_points_along_axes() {
        let v = DVec2::polar(2.0, FRAC_PI_2);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn with_length_keeps_direction() {
        let v = DVec2::new(3.0, 4.0).with_length(10.0);
        assert!((v.x - 6.0).abs() < 1e-12);
        assert!((v.y - 8.0).abs() < 1e-12);
    }

    #[test]
    fn with_length_on_zero_is_noop() {
        let v = DVec2::ZERO.with_length(5.0);
        assert_eq!(v, DVec2::ZERO);
    }

    #[test]
    fn angle_and_with_angle() {
        let v = DVec2::new(-1.0, 0.0);
        assert!((v.angle() - PI).abs() < 1e-12);
        let r = DVec2::new(3.0, 4.0).with_angle(0.0);
        assert!((r.x - 5.0).abs() < 1e-12);
        assert!(r.y.abs() < 1e-12);
    }

    #[test]
    fn distance_between_points() {
        let a = DVec2::new(1.0, 1.0);
        let b = DVec2::new(4.0, 5.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
    }
}
