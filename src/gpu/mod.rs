//! GPU resource management utilities.
//!
//! Provides wgpu device/surface initialization, driver diagnostics, scoped
//! binding state, typed uniform blocks, shader composition and full-screen
//! programs.

/// Scoped render-target, texture-unit and uniform-slot tracking.
pub mod binding;
/// Driver diagnostic routing to the log.
pub mod debug;
/// Shared wgpu boilerplate helpers for layouts and pipelines.
pub mod pipeline_helpers;
/// Full-screen shader programs resolved against the binding state.
pub mod program;
/// Blocking GPU → CPU copies.
pub mod readback;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Render targets and sampled textures.
pub mod texture;
/// Typed uniform blocks.
pub mod uniform;
