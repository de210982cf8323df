//! Geometry helpers on top of `glam::Vec3`.
//!
//! World space is Y-up. Facing is a unit forward vector; helpers that measure
//! angles or directions work in the horizontal (XZ) plane unless noted.

pub use glam::Vec3;

/// Below this length a vector is treated as zero.
pub const EPSILON: f32 = 0.0001;

/// Straight-line distance between two points.
#[must_use]
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    a.distance(b)
}

/// Unit direction from `from` to `to`, or zero when the points coincide.
#[must_use]
pub fn direction_to(from: Vec3, to: Vec3) -> Vec3 {
    let delta = to - from;
    if delta.length() < EPSILON {
        Vec3::ZERO
    } else {
        delta.normalize()
    }
}

/// Projects a vector onto the horizontal plane.
#[must_use]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Angle in degrees between a facing vector and the direction to a point,
/// measured in the horizontal plane.
///
/// Returns 0 when either vector is degenerate, so a target standing exactly
/// on the observer counts as in front of it.
#[must_use]
pub fn horizontal_angle_deg(facing: Vec3, from: Vec3, to: Vec3) -> f32 {
    let forward = flatten(facing);
    let toward = flatten(to - from);
    if forward.length() < EPSILON || toward.length() < EPSILON {
        return 0.0;
    }
    forward.angle_between(toward).to_degrees()
}

/// Linear interpolation between `a` and `b`, with `t` clamped to `[0, 1]`.
///
/// Returns exactly `a` at `t = 0` and exactly `b` at `t = 1`.
#[must_use]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a * (1.0 - t) + b * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_direction_to_degenerate() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(direction_to(p, p), Vec3::ZERO);
    }

    #[test]
    fn test_horizontal_angle() {
        let facing = Vec3::Z;
        let angle = horizontal_angle_deg(facing, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        assert!((angle - 90.0).abs() < 0.01);

        // Height difference is ignored
        let angle = horizontal_angle_deg(facing, Vec3::ZERO, Vec3::new(0.0, 5.0, 1.0));
        assert!(angle.abs() < 0.01);

        let behind = horizontal_angle_deg(facing, Vec3::ZERO, Vec3::new(0.0, 0.0, -4.0));
        assert!((behind - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_lerp_clamps() {
        assert_eq!(lerp(0.9, 0.1, 0.0), 0.9);
        assert_eq!(lerp(0.9, 0.1, 1.0), 0.1);
        assert_eq!(lerp(0.9, 0.1, 2.0), 0.1);
        assert!((lerp(0.0, 1.0, 0.25) - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_lerp_hits_endpoints_exactly() {
        for (a, b) in [(0.9, 0.1), (0.1, 0.9), (-3.7, 12.3), (1e-3, 250.0)] {
            assert_eq!(lerp(a, b, 0.0), a);
            assert_eq!(lerp(a, b, 1.0), b);
        }
    }

    proptest! {
        #[test]
        fn prop_horizontal_angle_in_range(
            fx in -10.0f32..10.0, fz in -10.0f32..10.0,
            tx in -10.0f32..10.0, tz in -10.0f32..10.0
        ) {
            let angle = horizontal_angle_deg(Vec3::new(fx, 0.0, fz), Vec3::ZERO, Vec3::new(tx, 3.0, tz));
            prop_assert!((0.0..=180.01).contains(&angle));
        }

        #[test]
        fn prop_lerp_stays_between(a in -100.0f32..100.0, b in -100.0f32..100.0, t in -2.0f32..3.0) {
            let v = lerp(a, b, t);
            prop_assert!(v >= a.min(b) - 1e-3 && v <= a.max(b) + 1e-3);
        }
    }
}
