//! Per-entity behaviours advanced once per frame before world matrices are
//! rebuilt.

use bevy_ecs::component::Component;
use glam::{Quat, Vec3};

use crate::util::easing::{catmull_rom, lerp, Easing};

/// Moves an entity along a closed Catmull-Rom loop through `points`,
/// spending `segment_travel_time` seconds on each segment.
///
/// With fewer than four points the entity is pinned to the first one.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct FollowPath {
    /// Waypoints; the loop closes from the last back to the first.
    pub points: Vec<Vec3>,
    /// Seconds per segment.
    pub segment_travel_time: f32,
    timer: f32,
    segment: usize,
}

impl FollowPath {
    /// New path starting at the first segment.
    #[must_use]
    pub fn new(points: Vec<Vec3>) -> Self {
        Self {
            points,
            segment_travel_time: 2.0,
            timer: 0.0,
            segment: 0,
        }
    }

    /// Builder-style travel time.
    #[must_use]
    pub fn with_travel_time(mut self, seconds: f32) -> Self {
        self.segment_travel_time = seconds;
        self
    }

    /// Index of the segment currently travelled.
    pub fn segment(&self) -> usize {
        self.segment
    }

    /// Advance by `dt` seconds and return the new position, or `None` when
    /// there is nothing to follow.
    pub fn advance(&mut self, dt: f32) -> Option<Vec3> {
        let n = self.points.len();
        if n == 0 || self.segment_travel_time <= 0.0 {
            return None;
        }
        if n < 4 {
            return Some(self.points[0]);
        }

        self.timer += dt;
        while self.timer >= self.segment_travel_time {
            self.timer -= self.segment_travel_time;
            self.segment = (self.segment + 1) % n;
        }
        let t = self.timer / self.segment_travel_time;

        let i = self.segment;
        let p0 = self.points[(i + n - 1) % n];
        let p1 = self.points[i];
        let p2 = self.points[(i + 1) % n];
        let p3 = self.points[(i + 2) % n];
        Some(catmull_rom(p0, p1, p2, p3, t))
    }
}

/// Moves an entity back and forth between two positions, reversing every
/// `period` seconds.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct PingPong {
    /// Start position.
    pub from: Vec3,
    /// End position.
    pub to: Vec3,
    /// Seconds per leg.
    pub period: f32,
    /// Curve applied within each leg.
    pub easing: Easing,
    elapsed: f32,
    reversed: bool,
}

impl PingPong {
    /// New linear ping-pong starting at `from`.
    #[must_use]
    pub fn new(from: Vec3, to: Vec3, period: f32) -> Self {
        Self {
            from,
            to,
            period,
            easing: Easing::Linear,
            elapsed: 0.0,
            reversed: false,
        }
    }

    /// Builder-style easing.
    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Advance by `dt` seconds and return the new position.
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        if self.period <= 0.0 {
            return self.from;
        }
        self.elapsed += dt;
        while self.elapsed >= self.period {
            self.elapsed -= self.period;
            self.reversed = !self.reversed;
        }
        let t = self.easing.apply(self.elapsed / self.period);
        if self.reversed {
            lerp(self.to, self.from, t)
        } else {
            lerp(self.from, self.to, t)
        }
    }
}

/// Keyboard-driven movement for the selected entity.
///
/// Only the enabled instance responds; selection cycling moves the enabled
/// flag between entities.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct SimpleMove {
    /// Whether this entity currently follows input.
    pub enabled: bool,
    /// Interpret input in the entity's local frame instead of world axes.
    pub relative: bool,
    /// Units per second.
    pub speed: f32,
}

impl Default for SimpleMove {
    fn default() -> Self {
        Self {
            enabled: false,
            relative: false,
            speed: 4.0,
        }
    }
}

impl SimpleMove {
    /// Displacement for a frame of `input` (each axis in -1..=1).
    #[must_use]
    pub fn displacement(&self, input: Vec3, rotation: Quat, dt: f32) -> Vec3 {
        if !self.enabled {
            return Vec3::ZERO;
        }
        let dir = if self.relative { rotation * input } else { input };
        dir * self.speed * dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 4.0),
            Vec3::new(0.0, 0.0, 4.0),
        ]
    }

    #[test]
    fn follow_path_reaches_waypoints_on_segment_boundaries() {
        let mut path = FollowPath::new(square()).with_travel_time(1.0);
        let start = path.advance(0.0).unwrap();
        assert!((start - Vec3::ZERO).length() < 1e-5);

        let next = path.advance(1.0).unwrap();
        assert_eq!(path.segment(), 1);
        assert!((next - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn follow_path_wraps_around_the_loop() {
        let mut path = FollowPath::new(square()).with_travel_time(0.5);
        let _ = path.advance(2.0);
        assert_eq!(path.segment(), 0);
    }

    #[test]
    fn short_paths_pin_to_first_point() {
        let first = Vec3::new(1.0, 2.0, 3.0);
        let mut path = FollowPath::new(vec![first, Vec3::ZERO, Vec3::ONE]);
        assert_eq!(path.advance(0.7), Some(first));
        assert_eq!(path.advance(5.0), Some(first));
        assert_eq!(FollowPath::new(Vec::new()).advance(1.0), None);
    }

    #[test]
    fn ping_pong_reverses_each_period() {
        let mut pp = PingPong::new(Vec3::ZERO, Vec3::X, 1.0);
        assert!((pp.advance(0.5) - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
        // 1.25 s in: second leg, a quarter of the way back
        assert!((pp.advance(0.75) - Vec3::new(0.75, 0.0, 0.0)).length() < 1e-6);
        assert!((pp.advance(1.0) - Vec3::new(0.25, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn simple_move_respects_enabled_and_relative() {
        let rot = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mut mover = SimpleMove::default();
        assert_eq!(mover.displacement(Vec3::Z, rot, 1.0), Vec3::ZERO);

        mover.enabled = true;
        mover.speed = 2.0;
        assert_eq!(mover.displacement(Vec3::Z, rot, 0.5), Vec3::Z);

        mover.relative = true;
        let d = mover.displacement(Vec3::Z, rot, 0.5);
        assert!((d - Vec3::X).length() < 1e-5);
    }
}
