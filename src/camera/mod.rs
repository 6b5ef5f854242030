//! Scene camera: perspective / orthographic projection and the GPU uniform
//! consumed by the geometry pass.

/// Core camera struct and GPU uniform types.
pub mod core;

pub use self::core::{Camera, CameraUniform, Projection};
