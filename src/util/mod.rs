//! Shared utilities: frame timing and interpolation curves.

pub mod easing;
pub mod frame_timing;
