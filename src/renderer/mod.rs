//! Deferred rendering passes.
//!
//! Framebuffers and the G-buffer at the bottom, the mesh passes that fill
//! them, the illumination composite that lights them and the post effect
//! that finishes the image.

pub mod framebuffer;
pub mod gbuffer;
pub mod geometry;
pub mod illumination;
pub mod lights;
pub mod mesh;
pub mod postprocess;
pub mod shadow;

pub use framebuffer::{BoundFramebuffer, Framebuffer, PassTargets};
pub use gbuffer::{DebugViews, GBuffer, GBufferChannel};
pub use geometry::GeometryPass;
pub use illumination::{IlluminationBuffer, LightingMode, LightingStage};
pub use lights::{DirectionalLight, PointLight};
pub use mesh::{GpuMesh, MeshBuilder, Vertex};
pub use postprocess::{EffectKind, PostEffect};
pub use shadow::ShadowMap;
