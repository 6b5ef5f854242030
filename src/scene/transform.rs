//! Local transform component with a cached world matrix.

use bevy_ecs::component::Component;
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Local position, rotation and scale of an entity, with cached world and
/// normal matrices.
///
/// Mutators only touch the local fields; the cached matrices are refreshed
/// by [`update_world_matrix`](Self::update_world_matrix), which the frame
/// loop runs for every entity before the shadow pass.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in world units.
    pub position: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
    world: Mat4,
    normal: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world: Mat4::IDENTITY,
            normal: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    /// Identity transform placed at `position`.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        let mut t = Self {
            position,
            ..Self::default()
        };
        t.update_world_matrix();
        t
    }

    /// Builder-style uniform scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self.update_world_matrix();
        self
    }

    /// Set the rotation from XYZ Euler angles in degrees.
    pub fn set_rotation_degrees(&mut self, degrees: Vec3) {
        let r = degrees * (std::f32::consts::PI / 180.0);
        self.rotation = Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z);
    }

    /// Rotation as XYZ Euler angles in degrees.
    #[must_use]
    pub fn rotation_degrees(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z) * (180.0 / std::f32::consts::PI)
    }

    /// Rotate so local -Z faces `target`. No-op if `target` coincides with
    /// the position.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let Some(forward) = (target - self.position).try_normalize() else {
            return;
        };
        let up = if forward.cross(up).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            up
        };
        let view = Mat4::look_to_rh(Vec3::ZERO, forward, up);
        self.rotation = Quat::from_mat4(&view.inverse());
    }

    /// Local -Z in world space.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Recompute the cached world and normal matrices.
    pub fn update_world_matrix(&mut self) {
        self.world = Mat4::from_scale_rotation_translation(
            self.scale,
            self.rotation,
            self.position,
        );
        self.normal = self.world.inverse().transpose();
    }

    /// Cached world matrix.
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    /// Cached inverse-transpose of the world matrix.
    #[must_use]
    pub fn normal_matrix(&self) -> Mat4 {
        self.normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_matrix_is_stale_until_updated() {
        let mut t = Transform::default();
        t.position = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(t.world_matrix(), Mat4::IDENTITY);
        t.update_world_matrix();
        assert_eq!(
            t.world_matrix().transform_point3(Vec3::ZERO),
            Vec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn euler_degrees_round_trip() {
        let mut t = Transform::default();
        t.set_rotation_degrees(Vec3::new(10.0, 45.0, -30.0));
        let back = t.rotation_degrees();
        assert!((back - Vec3::new(10.0, 45.0, -30.0)).abs().max_element() < 1e-3);
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut t = Transform::from_position(Vec3::new(0.0, 0.0, 5.0));
        t.look_at(Vec3::new(5.0, 0.0, 5.0), Vec3::Y);
        assert!((t.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let mut t = Transform::default().with_scale(Vec3::new(2.0, 1.0, 1.0));
        t.update_world_matrix();
        let n = t.normal_matrix().transform_vector3(Vec3::X);
        assert!((n - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }
}
