//! Materials and the registry that hands out their creation-order ids.

use std::sync::Arc;

use glam::Vec4;

use crate::gpu::texture::Texture2D;
use crate::gpu::uniform::UniformBlock;
use crate::renderer::geometry::GeometryPass;

/// Identity of a registered geometry shader. Ordered by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaderId(u32);

impl ShaderId {
    /// Raw registration index.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Identity of a created material. Ordered by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(u32);

impl MaterialId {
    /// Raw creation index.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Fragment variant of the G-buffer shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeometryShading {
    /// Two blended diffuse textures and a specular map.
    #[default]
    Textured,
    /// Per-vertex colour, no texture lookups.
    VertexColor,
}

impl GeometryShading {
    /// Every variant, in pipeline build order.
    pub const ALL: [Self; 2] = [Self::Textured, Self::VertexColor];

    /// WGSL fragment entry point.
    pub const fn fs_entry(self) -> &'static str {
        match self {
            Self::Textured => "fs_main",
            Self::VertexColor => "fs_vertex_color",
        }
    }
}

/// A registered shader: its id plus the variant it renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderHandle {
    /// Registration id, used as the secondary sort key.
    pub id: ShaderId,
    /// Fragment variant.
    pub shading: GeometryShading,
}

/// Material parameters as seen by `gbuffer_pass.wgsl` (group 2, binding 0).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Multiplied into the albedo.
    pub tint: [f32; 4],
    /// Specular exponent, stored as `shininess / 256` in the G-buffer.
    pub shininess: f32,
    /// Blend factor between the two diffuse textures.
    pub texture_mix: f32,
    /// Specular map multiplier.
    pub specular_strength: f32,
    pub(crate) _pad: f32,
}

const _: () = assert!(size_of::<MaterialUniform>() == 32);

/// Everything needed to create a material.
#[derive(Debug, Clone)]
pub struct MaterialDesc {
    /// Debug label.
    pub label: String,
    /// Primary sort key; lower layers draw first.
    pub render_layer: i32,
    /// Albedo tint.
    pub tint: Vec4,
    /// Specular exponent.
    pub shininess: f32,
    /// 0 shows `diffuse_a`, 1 shows `diffuse_b`.
    pub texture_mix: f32,
    /// Specular multiplier.
    pub specular_strength: f32,
    /// First diffuse texture; white when absent.
    pub diffuse_a: Option<Arc<Texture2D>>,
    /// Second diffuse texture; white when absent.
    pub diffuse_b: Option<Arc<Texture2D>>,
    /// Specular map (red channel); white when absent.
    pub specular: Option<Arc<Texture2D>>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            label: "Material".to_owned(),
            render_layer: 0,
            tint: Vec4::ONE,
            shininess: 32.0,
            texture_mix: 0.0,
            specular_strength: 0.5,
            diffuse_a: None,
            diffuse_b: None,
            specular: None,
        }
    }
}

/// A material bound to one registered shader.
#[derive(Debug)]
pub struct ShaderMaterial {
    id: MaterialId,
    shader: ShaderHandle,
    render_layer: i32,
    label: String,
    uniform: UniformBlock<MaterialUniform>,
    textures: [Arc<Texture2D>; 3],
    bind_group: wgpu::BindGroup,
}

impl ShaderMaterial {
    /// Creation-order id.
    pub fn id(&self) -> MaterialId {
        self.id
    }

    /// Owning shader.
    pub fn shader(&self) -> ShaderHandle {
        self.shader
    }

    /// Primary sort key.
    pub fn render_layer(&self) -> i32 {
        self.render_layer
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current parameters.
    pub fn params(&self) -> &MaterialUniform {
        self.uniform.get()
    }

    /// Diffuse A, diffuse B and specular textures.
    pub fn textures(&self) -> &[Arc<Texture2D>; 3] {
        &self.textures
    }

    /// Replace the parameters and upload them.
    pub fn set_params(&mut self, queue: &wgpu::Queue, params: MaterialUniform) {
        self.uniform.write(queue, params);
    }

    /// Group 2 bind group for the geometry pass.
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Hands out monotonically increasing shader and material ids and creates
/// materials against the geometry pass layout.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    next_shader: u32,
    next_material: u32,
    white: Option<Arc<Texture2D>>,
}

impl MaterialRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shader variant. Every call yields a new, larger id.
    pub fn register_shader(&mut self, shading: GeometryShading) -> ShaderHandle {
        let id = ShaderId(self.next_shader);
        self.next_shader += 1;
        log::debug!("registered shader {} ({shading:?})", id.0);
        ShaderHandle { id, shading }
    }

    /// Reserve the next material id.
    pub fn allocate_material_id(&mut self) -> MaterialId {
        let id = MaterialId(self.next_material);
        self.next_material += 1;
        id
    }

    /// Number of shaders registered so far.
    pub fn shader_count(&self) -> u32 {
        self.next_shader
    }

    /// Number of materials created so far.
    pub fn material_count(&self) -> u32 {
        self.next_material
    }

    fn white(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Arc<Texture2D> {
        self.white
            .get_or_insert_with(|| {
                Arc::new(Texture2D::solid(device, queue, "White", [255; 4]))
            })
            .clone()
    }

    /// Create a material for `shader` from `desc`.
    pub fn create_material(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        geometry: &GeometryPass,
        shader: ShaderHandle,
        desc: MaterialDesc,
    ) -> ShaderMaterial {
        let id = self.allocate_material_id();
        let white = self.white(device, queue);
        let textures = [desc.diffuse_a, desc.diffuse_b, desc.specular]
            .map(|t| t.unwrap_or_else(|| white.clone()));

        let uniform = UniformBlock::new(
            device,
            &format!("{} Uniform", desc.label),
            MaterialUniform {
                tint: desc.tint.to_array(),
                shininess: desc.shininess,
                texture_mix: desc.texture_mix,
                specular_strength: desc.specular_strength,
                _pad: 0.0,
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", desc.label)),
            layout: geometry.material_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures[0].view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&textures[1].view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&textures[2].view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(
                        geometry.material_sampler(),
                    ),
                },
            ],
        });

        ShaderMaterial {
            id,
            shader,
            render_layer: desc.render_layer,
            label: desc.label,
            uniform,
            textures,
            bind_group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_in_creation_order() {
        let mut registry = MaterialRegistry::new();
        let a = registry.register_shader(GeometryShading::Textured);
        let b = registry.register_shader(GeometryShading::Textured);
        assert!(a.id < b.id);
        let m0 = registry.allocate_material_id();
        let m1 = registry.allocate_material_id();
        assert!(m0 < m1);
        assert_eq!(registry.shader_count(), 2);
        assert_eq!(registry.material_count(), 2);
    }

    #[test]
    fn shading_variants_pick_entry_points() {
        assert_eq!(GeometryShading::Textured.fs_entry(), "fs_main");
        assert_eq!(GeometryShading::VertexColor.fs_entry(), "fs_vertex_color");
    }
}
