// extensions/easing.rs
//
// Easing curves for zoom transitions.
// Pure math, no dependencies on the view or the displays.

use std::f64::consts::PI;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Easing function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant velocity (no easing).
    Linear,
    /// Slow start and end on a half cosine wave.
    #[default]
    SineInOut,
    /// Slow start and end, quadratic.
    QuadInOut,
    /// Stronger slow start and end.
    CubicInOut,
}

impl Easing {
    /// Apply the easing function to a normalized time value `t` in [0, 1].
    /// Every curve maps 0 to exactly 0 and 1 to exactly 1.
    #[inline]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            // (1 - cos(pi t)) / 2: the complement of the zoom's start weight.
            Easing::SineInOut => (1.0 - (PI * t).cos()) / 2.0,
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

// ── Interpolation helpers ────────────────────────────────────────────────

/// Weighted blend `a * (1 - t) + b * t`. Returns `a` exactly at `t = 0` and
/// `b` exactly at `t = 1`.
#[inline]
pub fn mix(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Weighted blend of two vectors, exact at both ends.
#[inline]
pub fn mix_vec2(a: DVec2, b: DVec2, t: f64) -> DVec2 {
    a * (1.0 - t) + b * t
}

/// Interpolate with easing.
#[inline]
pub fn ease(a: f64, b: f64, t: f64, easing: Easing) -> f64 {
    mix(a, b, easing.apply(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 4] = [Easing::Linear, Easing::SineInOut, Easing::QuadInOut, Easing::CubicInOut];

    #[test]
    fn endpoints_are_exact() {
        for easing in ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{:?}", easing);
            assert_eq!(easing.apply(1.0), 1.0, "{:?}", easing);
        }
    }

    #[test]
    fn sine_matches_cosine_weight() {
        for i in 0..=20 {
            let p = i as f64 / 20.0;
            let u = (1.0 + (PI * p).cos()) / 2.0;
            assert!((Easing::SineInOut.apply(p) - (1.0 - u)).abs() < 1e-12);
        }
    }

    #[test]
    fn in_out_curves_are_symmetric() {
        for easing in ALL {
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-12, "{:?}", easing);
            let early = easing.apply(0.2);
            let late = easing.apply(0.8);
            assert!((early + late - 1.0).abs() < 1e-12, "{:?}", easing);
        }
    }

    #[test]
    fn mix_is_exact_at_ends() {
        assert_eq!(mix(0.1, 0.3, 0.0), 0.1);
        assert_eq!(mix(0.1, 0.3, 1.0), 0.3);
        assert_eq!(mix_vec2(DVec2::new(0.7, -3.3), DVec2::new(1.9, 8.1), 1.0), DVec2::new(1.9, 8.1));
        let result = ease(100.0, 200.0, 0.5, Easing::Linear);
        assert!((result - 150.0).abs() < 1e-9);
    }

    #[test]
    fn parses_from_config() {
        let e: Easing = serde_json::from_str("\"cubic_in_out\"").unwrap();
        assert_eq!(e, Easing::CubicInOut);
    }
}
