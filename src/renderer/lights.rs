//! Light uniform blocks.
//!
//! Both blocks are `#[repr(C)]` and exactly 64 bytes; the WGSL structs in
//! `modules/lights.wgsl` mirror them field for field.

use glam::{Mat4, Vec3, Vec4};

/// Sun light, uploaded verbatim to uniform slot 0.
///
/// | Offset | Field                 |
/// |--------|-----------------------|
/// | 0      | `direction` (xyz, w unused) |
/// | 16     | `color`               |
/// | 32     | `ambient_color`       |
/// | 48     | `ambient_power`       |
/// | 52     | `light_ambient_power` |
/// | 56     | `specular_power`      |
/// | 60     | `shadow_bias`         |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLight {
    /// Direction the light travels (towards the scene).
    pub direction: [f32; 4],
    /// Light colour.
    pub color: [f32; 4],
    /// Scene ambient colour.
    pub ambient_color: [f32; 4],
    /// Scene ambient strength.
    pub ambient_power: f32,
    /// Ambient contribution carried by the light itself.
    pub light_ambient_power: f32,
    /// Specular multiplier.
    pub specular_power: f32,
    /// Depth bias for shadow comparisons.
    pub shadow_bias: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: [-1.0, -1.0, -1.0, 0.0],
            color: [1.0, 1.0, 1.0, 1.0],
            ambient_color: [1.0, 1.0, 1.0, 1.0],
            ambient_power: 0.1,
            light_ambient_power: 0.1,
            specular_power: 1.0,
            shadow_bias: 0.005,
        }
    }
}

impl DirectionalLight {
    /// Direction as a normalized vector; falls back to straight down when
    /// the stored direction is zero.
    pub fn direction(&self) -> Vec3 {
        Vec4::from_array(self.direction)
            .truncate()
            .try_normalize()
            .unwrap_or(Vec3::NEG_Y)
    }

    /// Set the direction; `w` is kept at zero.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.extend(0.0).to_array();
    }

    /// Orthographic view-projection of the light, looking at `center`
    /// from `distance` away and covering a `half_extent` square.
    pub fn light_space_view_proj(
        &self,
        center: Vec3,
        half_extent: f32,
        distance: f32,
    ) -> Mat4 {
        let dir = self.direction();
        // look_at degenerates when up is parallel to the view direction
        let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let eye = center - dir * distance;
        let view = Mat4::look_at_rh(eye, center, up);
        let proj = Mat4::orthographic_rh(
            -half_extent,
            half_extent,
            -half_extent,
            half_extent,
            0.1,
            distance * 2.0,
        );
        proj * view
    }
}

/// Point light, uploaded verbatim to uniform slot 1 (slot 0 for HDR).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLight {
    /// World position (w unused).
    pub position: [f32; 4],
    /// Light colour.
    pub color: [f32; 4],
    /// Ambient colour emitted around the light.
    pub ambient_color: [f32; 4],
    /// Ambient strength.
    pub ambient_power: f32,
    /// Specular multiplier.
    pub specular_power: f32,
    /// Linear attenuation coefficient.
    pub linear_falloff: f32,
    /// Quadratic attenuation coefficient.
    pub quadratic_falloff: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: [0.0, 5.0, 0.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
            ambient_color: [1.0, 1.0, 1.0, 1.0],
            ambient_power: 0.05,
            specular_power: 1.0,
            linear_falloff: 0.09,
            quadratic_falloff: 0.032,
        }
    }
}

impl PointLight {
    /// Move the light.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position.extend(1.0).to_array();
    }
}

/// Per-stage parameters shared by the lighting programs (slot 2).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingPassUniform {
    /// Sun view-projection used for shadow lookups.
    pub light_space_view_proj: [[f32; 4]; 4],
    /// Camera world position (w unused).
    pub cam_pos: [f32; 4],
    /// x: sun enabled, y: point light enabled, z: ambient reads the
    /// composite history as its lit colour.
    pub flags: [f32; 4],
}

impl LightingPassUniform {
    /// Build from the cached matrices and flags.
    pub fn new(
        light_space_view_proj: Mat4,
        cam_pos: Vec3,
        sun: bool,
        point: bool,
        lit_from_history: bool,
    ) -> Self {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Self {
            light_space_view_proj: light_space_view_proj.to_cols_array_2d(),
            cam_pos: cam_pos.extend(1.0).to_array(),
            flags: [flag(sun), flag(point), flag(lit_from_history), 0.0],
        }
    }
}

const _: () = assert!(size_of::<DirectionalLight>() == 64);
const _: () = assert!(size_of::<PointLight>() == 64);
const _: () = assert!(size_of::<LightingPassUniform>() == 96);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_blocks_are_64_bytes() {
        assert_eq!(size_of::<DirectionalLight>(), 64);
        assert_eq!(size_of::<PointLight>(), 64);
    }

    #[test]
    fn sun_block_bytes_match_fields() {
        let sun = DirectionalLight {
            direction: [0.0, -1.0, 0.5, 0.0],
            ambient_power: 0.25,
            shadow_bias: 0.01,
            ..Default::default()
        };
        let bytes = bytemuck::bytes_of(&sun);
        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(&floats[0..4], &[0.0, -1.0, 0.5, 0.0]);
        assert_eq!(floats[12], 0.25);
        assert_eq!(floats[15], 0.01);
        let back: DirectionalLight = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(back, sun);
    }

    #[test]
    fn defaults_match_documented_values() {
        let sun = DirectionalLight::default();
        assert_eq!(sun.direction, [-1.0, -1.0, -1.0, 0.0]);
        assert_eq!(sun.color, [1.0; 4]);
        assert_eq!(sun.ambient_power, 0.1);
        assert_eq!(sun.light_ambient_power, 0.1);
        assert_eq!(sun.specular_power, 1.0);
        assert_eq!(sun.shadow_bias, 0.005);
    }

    #[test]
    fn vertical_sun_still_builds_a_finite_view() {
        let mut sun = DirectionalLight::default();
        sun.set_direction(Vec3::NEG_Y);
        let m = sun.light_space_view_proj(Vec3::ZERO, 10.0, 20.0);
        assert!(m.is_finite());
        // Scene centre lands in the middle of the light's clip space.
        let clip = m.project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&clip.z));
    }

    #[test]
    fn pass_flags_encode_booleans() {
        let p = LightingPassUniform::new(Mat4::IDENTITY, Vec3::ONE, true, false, true);
        assert_eq!(p.flags, [1.0, 0.0, 1.0, 0.0]);
        assert_eq!(p.cam_pos, [1.0, 1.0, 1.0, 1.0]);
    }
}
