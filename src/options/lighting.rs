use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::renderer::{DirectionalLight, PointLight};

/// Sun and point-light parameters applied at startup and on preset load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingOptions {
    /// Whether the directional stage runs.
    pub sun_enabled: bool,
    /// Run the point-light sequence (directional, HDR, ambient) instead of
    /// the sun sequence.
    pub point_mode: bool,
    /// Direction the sunlight travels.
    pub sun_direction: [f32; 3],
    /// Sunlight colour.
    pub sun_color: [f32; 3],
    /// Scene ambient colour.
    pub ambient_color: [f32; 3],
    /// Scene ambient strength.
    pub ambient_power: f32,
    /// Ambient carried by the sun itself.
    pub light_ambient_power: f32,
    /// Specular multiplier for the sun.
    pub specular_power: f32,
    /// Depth bias for shadow comparisons.
    pub shadow_bias: f32,
    /// Point-light world position.
    pub point_position: [f32; 3],
    /// Point-light colour.
    pub point_color: [f32; 3],
    /// Linear attenuation coefficient.
    pub point_linear_falloff: f32,
    /// Quadratic attenuation coefficient.
    pub point_quadratic_falloff: f32,
}

impl Default for LightingOptions {
    fn default() -> Self {
        let sun = DirectionalLight::default();
        let point = PointLight::default();
        Self {
            sun_enabled: true,
            point_mode: false,
            sun_direction: [-1.0, -1.0, -1.0],
            sun_color: [1.0, 1.0, 1.0],
            ambient_color: [1.0, 1.0, 1.0],
            ambient_power: sun.ambient_power,
            light_ambient_power: sun.light_ambient_power,
            specular_power: sun.specular_power,
            shadow_bias: sun.shadow_bias,
            point_position: [0.0, 5.0, 0.0],
            point_color: [1.0, 1.0, 1.0],
            point_linear_falloff: point.linear_falloff,
            point_quadratic_falloff: point.quadratic_falloff,
        }
    }
}

impl LightingOptions {
    /// Sun uniform block described by these options.
    #[must_use]
    pub fn sun(&self) -> DirectionalLight {
        let mut sun = DirectionalLight {
            color: Vec3::from_array(self.sun_color).extend(1.0).to_array(),
            ambient_color: Vec3::from_array(self.ambient_color)
                .extend(1.0)
                .to_array(),
            ambient_power: self.ambient_power,
            light_ambient_power: self.light_ambient_power,
            specular_power: self.specular_power,
            shadow_bias: self.shadow_bias,
            ..DirectionalLight::default()
        };
        sun.set_direction(Vec3::from_array(self.sun_direction));
        sun
    }

    /// Point-light uniform block described by these options.
    #[must_use]
    pub fn point_light(&self) -> PointLight {
        let mut point = PointLight {
            color: Vec3::from_array(self.point_color).extend(1.0).to_array(),
            linear_falloff: self.point_linear_falloff,
            quadratic_falloff: self.point_quadratic_falloff,
            ..PointLight::default()
        };
        point.set_position(Vec3::from_array(self.point_position));
        point
    }
}
