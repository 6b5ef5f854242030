//! The component that makes an entity drawable.

use std::sync::Arc;

use bevy_ecs::component::Component;

use super::material::ShaderMaterial;
use super::transform::Transform;
use crate::renderer::geometry::ObjectBinding;
use crate::renderer::{GeometryPass, GpuMesh};

/// What an entity draws: a shared mesh, a shared material and the
/// per-entity transform block.
#[derive(Component, Debug)]
pub struct RendererComponent {
    /// Vertex and index buffers.
    pub mesh: Arc<GpuMesh>,
    /// Material (and through it, the shader).
    pub material: Arc<ShaderMaterial>,
    /// Whether the entity is drawn into the shadow map.
    pub cast_shadows: bool,
    pub(crate) object: ObjectBinding,
}

impl RendererComponent {
    /// Allocate the transform block for a new renderable.
    pub fn new(
        device: &wgpu::Device,
        geometry: &GeometryPass,
        mesh: Arc<GpuMesh>,
        material: Arc<ShaderMaterial>,
        cast_shadows: bool,
    ) -> Self {
        let object = ObjectBinding::new(device, geometry, mesh.label());
        Self {
            mesh,
            material,
            cast_shadows,
            object,
        }
    }

    /// Upload the cached world and normal matrices of `transform`.
    pub fn sync(&mut self, queue: &wgpu::Queue, transform: &Transform) {
        self.object.sync(queue, transform);
    }

    /// Sort key of this renderable.
    #[must_use]
    pub fn render_key(&self) -> super::render_queue::RenderKey {
        super::render_queue::RenderKey::of(&self.material)
    }
}
