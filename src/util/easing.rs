//! Interpolation helpers for scene behaviours.

use std::ops::{Add, Mul, Sub};

/// Shaping curve applied to a `0..=1` parameter before interpolating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    /// Hermite smoothstep: zero velocity at both ends.
    SmoothStep,
    /// Quadratic ease-in then ease-out.
    QuadraticInOut,
}

impl Easing {
    /// Shape `t`, clamped to `0..=1`.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
            Self::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * 0.5
                }
            }
        }
    }
}

/// `(1 - t) * a + t * b` for any vector-like type.
#[inline]
pub fn lerp<T>(a: T, b: T, t: f32) -> T
where
    T: Add<Output = T> + Mul<f32, Output = T>,
{
    a * (1.0 - t) + b * t
}

/// Uniform Catmull-Rom spline between `p1` (t = 0) and `p2` (t = 1).
#[inline]
pub fn catmull_rom<T>(p0: T, p1: T, p2: T, p3: T, t: f32) -> T
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
{
    let t2 = t * t;
    let t3 = t2 * t;
    (p1 * 2.0
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * t3)
        * 0.5
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn catmull_passes_through_inner_control_points() {
        let p = [
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(2.0, 3.0, 0.0),
        ];
        assert!((catmull_rom(p[0], p[1], p[2], p[3], 0.0) - p[1]).length() < 1e-6);
        assert!((catmull_rom(p[0], p[1], p[2], p[3], 1.0) - p[2]).length() < 1e-6);
    }

    #[test]
    fn catmull_on_a_line_is_linear() {
        let at = |x: f32| Vec3::new(x, 0.0, 0.0);
        let mid = catmull_rom(at(0.0), at(1.0), at(2.0), at(3.0), 0.5);
        assert!((mid - at(1.5)).length() < 1e-6);
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        assert_eq!(lerp(Vec3::ZERO, Vec3::ONE, 0.0), Vec3::ZERO);
        assert_eq!(lerp(Vec3::ZERO, Vec3::ONE, 1.0), Vec3::ONE);
        assert_eq!(lerp(2.0_f32, 4.0, 0.5), 3.0);
    }

    #[test]
    fn easing_curves_fix_endpoints() {
        for easing in [Easing::Linear, Easing::SmoothStep, Easing::QuadraticInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6);
            assert_eq!(easing.apply(-3.0), 0.0);
        }
        assert_eq!(Easing::SmoothStep.apply(0.5), 0.5);
        assert_eq!(Easing::QuadraticInOut.apply(0.25), 0.125);
    }
}
