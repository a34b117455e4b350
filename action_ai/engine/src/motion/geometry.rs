//! Planar geometry over landmarks
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::frame::Landmark;

/// Angle in degrees at `vertex` between the rays to `a` and `b`.
/// 180 means a straight line, 0 fully folded.
pub fn angle_between_points(a: Landmark, vertex: Landmark, b: Landmark) -> f32 {
    let to_a = (a.y - vertex.y).atan2(a.x - vertex.x);
    let to_b = (b.y - vertex.y).atan2(b.x - vertex.x);
    let degrees = (to_a - to_b).abs().to_degrees();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

pub fn distance(a: Landmark, b: Landmark) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Displacement magnitude per second. Zero when no time elapsed.
pub fn velocity(prev: Landmark, curr: Landmark, dt_ms: i64) -> f32 {
    if dt_ms <= 0 {
        return 0.0;
    }
    distance(prev, curr) / (dt_ms as f32 / 1000.0)
}

/// Signed horizontal velocity per second. Zero when no time elapsed.
pub fn horizontal_velocity(prev: Landmark, curr: Landmark, dt_ms: i64) -> f32 {
    if dt_ms <= 0 {
        return 0.0;
    }
    (curr.x - prev.x) / (dt_ms as f32 / 1000.0)
}

pub fn midpoint(a: Landmark, b: Landmark) -> Landmark {
    Landmark::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Linear rescale of `value` into [0,1]. A degenerate range maps everything to 0.
pub fn normalize(value: f32, min: f32, max: f32) -> f32 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Inclusive range of acceptable values for one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lo: f32,
    pub hi: f32,
}

impl Band {
    pub const fn new(lo: f32, hi: f32) -> Self {
        Band { lo, hi }
    }

    /// Open-ended band: anything at or above `lo`.
    pub const fn at_least(lo: f32) -> Self {
        Band { lo, hi: f32::INFINITY }
    }

    /// Open-ended band: anything at or below `hi`.
    pub const fn at_most(hi: f32) -> Self {
        Band {
            lo: f32::NEG_INFINITY,
            hi,
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.lo && value <= self.hi
    }

    pub fn is_below(&self, value: f32) -> bool {
        value < self.lo
    }

    /// Distance outside the band relative to the band width (or to the bound for open bands).
    pub fn deviation(&self, value: f32) -> f32 {
        let outside = if value < self.lo {
            self.lo - value
        } else if value > self.hi {
            value - self.hi
        } else {
            return 0.0;
        };
        let scale = if self.lo.is_finite() && self.hi.is_finite() {
            self.hi - self.lo
        } else if self.lo.is_finite() {
            self.lo.abs()
        } else {
            self.hi.abs()
        };
        if scale > f32::EPSILON {
            outside / scale
        } else {
            outside
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Landmark {
        Landmark::new(x, y)
    }

    #[test]
    fn angle_straight_right_and_folded() {
        assert!((angle_between_points(p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)) - 180.0).abs() < 1e-3);
        assert!((angle_between_points(p(1.0, 1.0), p(1.0, 0.0), p(2.0, 0.0)) - 90.0).abs() < 1e-3);
        assert!(angle_between_points(p(2.0, 0.0), p(1.0, 0.0), p(3.0, 0.0)).abs() < 1e-3);
    }

    #[test]
    fn angle_is_folded_into_half_turn() {
        // Rays at +170 and -170 degrees are 20 degrees apart, not 340.
        let a = p((170f32).to_radians().cos(), (170f32).to_radians().sin());
        let b = p((-170f32).to_radians().cos(), (-170f32).to_radians().sin());
        let angle = angle_between_points(a, p(0.0, 0.0), b);
        assert!((angle - 20.0).abs() < 1e-2, "got {angle}");
    }

    #[test]
    fn velocity_guards_non_positive_dt() {
        assert_eq!(velocity(p(0.0, 0.0), p(1.0, 0.0), 0), 0.0);
        assert_eq!(velocity(p(0.0, 0.0), p(1.0, 0.0), -33), 0.0);
        assert_eq!(horizontal_velocity(p(0.0, 0.0), p(1.0, 0.0), 0), 0.0);
        assert!((velocity(p(0.0, 0.0), p(0.03, 0.04), 500) - 0.1).abs() < 1e-6);
        assert!((horizontal_velocity(p(0.5, 0.0), p(0.4, 0.0), 1000) + 0.1).abs() < 1e-6);
    }

    #[test]
    fn midpoint_and_distance() {
        assert_eq!(midpoint(p(0.0, 0.0), p(0.4, 0.2)), p(0.2, 0.1));
        assert!((distance(p(0.0, 0.0), p(0.3, 0.4)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn normalize_clamps_and_guards_degenerate_range() {
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(normalize(50.0, 0.0, 10.0), 1.0);
        assert_eq!(normalize(5.0, 10.0, 10.0), 0.0);
        assert_eq!(normalize(5.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn band_deviation() {
        let band = Band::new(90.0, 120.0);
        assert!(band.contains(100.0));
        assert_eq!(band.deviation(100.0), 0.0);
        assert!((band.deviation(135.0) - 0.5).abs() < 1e-6);
        assert!(band.is_below(60.0));
        assert!((band.deviation(60.0) - 1.0).abs() < 1e-6);
        assert!((Band::at_least(160.0).deviation(144.0) - 0.1).abs() < 1e-6);
        assert_eq!(Band::at_most(300.0).deviation(200.0), 0.0);
    }
}
