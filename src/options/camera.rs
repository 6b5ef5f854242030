use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
/// Camera projection and movement parameters.
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Visible height of the orthographic projection.
    pub ortho_height: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
    /// Units per second for the selected entity.
    pub move_speed: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fovy: 60.0,
            ortho_height: 10.0,
            znear: 0.1,
            zfar: 100.0,
            move_speed: 4.0,
        }
    }
}
