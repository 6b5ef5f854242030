use bevy_ecs::component::Component;
use glam::{Mat4, Vec3};

/// How the camera projects the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// Perspective with a vertical field of view.
    #[default]
    Perspective,
    /// Orthographic with a fixed view-volume height.
    Orthographic,
}

/// Camera defined by eye position, target and projection parameters.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye (camera) position in world space.
    pub eye: Vec3,
    /// Look-at target position.
    pub target: Vec3,
    /// Up direction vector.
    pub up: Vec3,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Height of the orthographic view volume in world units.
    pub ortho_height: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
    /// Active projection mode.
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 4.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect: 16.0 / 9.0,
            fovy: 60.0,
            ortho_height: 10.0,
            znear: 0.1,
            zfar: 100.0,
            projection: Projection::Perspective,
        }
    }
}

impl Camera {
    /// Perspective camera looking from `eye` at `target`.
    pub fn perspective(eye: Vec3, target: Vec3, fovy: f32, aspect: f32) -> Self {
        Self {
            eye,
            target,
            fovy,
            aspect,
            ..Self::default()
        }
    }

    /// Projection matrix for the current mode.
    pub fn projection(&self) -> Mat4 {
        // glam's *_rh builders already use the [0,1] depth range wgpu expects
        match self.projection {
            Projection::Perspective => Mat4::perspective_rh(
                self.fovy.to_radians(),
                self.aspect,
                self.znear,
                self.zfar,
            ),
            Projection::Orthographic => {
                let half_h = self.ortho_height * 0.5;
                let half_w = half_h * self.aspect;
                Mat4::orthographic_rh(
                    -half_w, half_w, -half_h, half_h, self.znear, self.zfar,
                )
            }
        }
    }

    /// View matrix.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Combined view-projection matrix.
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Switch between perspective and orthographic projection.
    pub fn toggle_ortho(&mut self) {
        self.projection = match self.projection {
            Projection::Perspective => Projection::Orthographic,
            Projection::Orthographic => Projection::Perspective,
        };
        log::debug!("camera projection: {:?}", self.projection);
    }

    /// Recompute the aspect ratio for a new window size. Zero-sized
    /// windows (minimized) are ignored.
    pub fn resize_window(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// Unit vector from eye towards target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).try_normalize().unwrap_or(Vec3::NEG_Z)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
/// GPU uniform holding the camera matrices (group 0 of the geometry pass).
pub struct CameraUniform {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// View matrix.
    pub view: [[f32; 4]; 4],
    /// Camera world-space position (w = 1).
    pub position: [f32; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl CameraUniform {
    /// Snapshot of `camera`.
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            position: camera.eye.extend(1.0).to_array(),
        }
    }
}

const _: () = assert!(size_of::<CameraUniform>() == 144);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_changes_projection() {
        let mut camera = Camera::default();
        let before = camera.projection();
        camera.resize_window(800, 800);
        assert!((camera.aspect - 1.0).abs() < f32::EPSILON);
        assert_ne!(before, camera.projection());
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut camera = Camera::default();
        let aspect = camera.aspect;
        camera.resize_window(0, 600);
        assert_eq!(camera.aspect, aspect);
    }

    #[test]
    fn toggle_ortho_round_trips() {
        let mut camera = Camera::default();
        let perspective = camera.projection();
        camera.toggle_ortho();
        assert_eq!(camera.projection, Projection::Orthographic);
        assert_ne!(camera.projection(), perspective);
        camera.toggle_ortho();
        assert_eq!(camera.projection(), perspective);
    }

    #[test]
    fn target_projects_to_screen_centre() {
        let camera = Camera::default();
        let ndc = camera.view_projection().project_point3(camera.target);
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
