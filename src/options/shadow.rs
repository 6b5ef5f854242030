use serde::{Deserialize, Serialize};

/// Sun shadow-map parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadowOptions {
    /// Depth texture edge length in texels.
    pub resolution: u32,
    /// Half the side of the square the orthographic light frustum covers.
    pub half_extent: f32,
    /// Distance from the scene centre to the light eye.
    pub distance: f32,
}

impl Default for ShadowOptions {
    fn default() -> Self {
        Self {
            resolution: 4096,
            half_extent: 20.0,
            distance: 30.0,
        }
    }
}
