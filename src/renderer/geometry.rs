//! Mesh passes: the G-buffer fill and the shadow depth pass.
//!
//! Bind groups follow the layout of `gbuffer_pass.wgsl`:
//! group 0 camera, group 1 per-object transform, group 2 material.
//! The shadow pass reuses group 1 and swaps group 0 for the light camera.

use glam::Mat4;
use rustc_hash::FxHashMap;

use super::framebuffer::PassTargets;
use super::gbuffer::GBuffer;
use super::mesh::Vertex;
use super::shadow::ShadowMap;
use crate::camera::{Camera, CameraUniform};
use crate::error::DeferredError;
use crate::gpu::binding::BindingState;
use crate::gpu::pipeline_helpers::{
    self, create_mesh_pipeline, depth_write_less, MeshPipelineDesc,
};
use crate::gpu::shader_composer::{sources, ShaderComposer};
use crate::gpu::uniform::UniformBlock;
use crate::scene::material::GeometryShading;
use crate::scene::renderable::RendererComponent;
use crate::scene::transform::Transform;

/// Per-object transform (group 1).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    /// World matrix.
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of the world matrix.
    pub normal_matrix: [[f32; 4]; 4],
}

impl Default for ObjectUniform {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            normal_matrix: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

impl From<&Transform> for ObjectUniform {
    fn from(t: &Transform) -> Self {
        Self {
            model: t.world_matrix().to_cols_array_2d(),
            normal_matrix: t.normal_matrix().to_cols_array_2d(),
        }
    }
}

/// Sun camera for the shadow pass (group 0 of `shadow_depth.wgsl`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightCameraUniform {
    /// Light-space view-projection.
    pub view_proj: [[f32; 4]; 4],
}

const _: () = assert!(size_of::<ObjectUniform>() == 128);
const _: () = assert!(size_of::<LightCameraUniform>() == 64);

/// An object's transform block and its group 1 bind group.
#[derive(Debug)]
pub struct ObjectBinding {
    block: UniformBlock<ObjectUniform>,
    bind_group: wgpu::BindGroup,
}

impl ObjectBinding {
    /// Allocate against the geometry pass object layout.
    pub fn new(device: &wgpu::Device, geometry: &GeometryPass, label: &str) -> Self {
        let block = UniformBlock::new(
            device,
            &format!("{label} Object"),
            ObjectUniform::default(),
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Object Bind Group")),
            layout: &geometry.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: block.buffer().as_entire_binding(),
            }],
        });
        Self { block, bind_group }
    }

    /// Upload the cached matrices of `transform`.
    pub fn sync(&mut self, queue: &wgpu::Queue, transform: &Transform) {
        self.block.write(queue, ObjectUniform::from(transform));
    }

    /// Last uploaded value.
    pub fn uniform(&self) -> &ObjectUniform {
        self.block.get()
    }

    /// Group 1 bind group.
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Pipelines, layouts and per-frame camera blocks of the mesh passes.
pub struct GeometryPass {
    camera: UniformBlock<CameraUniform>,
    camera_bind_group: wgpu::BindGroup,
    light_camera: UniformBlock<LightCameraUniform>,
    light_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    material_sampler: wgpu::Sampler,
    pipelines: FxHashMap<GeometryShading, wgpu::RenderPipeline>,
    shadow_pipeline: wgpu::RenderPipeline,
}

fn single_uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[pipeline_helpers::uniform_buffer(0)],
    })
}

fn uniform_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

impl GeometryPass {
    /// Compose the mesh shaders and build every pipeline up front.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Shader`] on composition failure.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
    ) -> Result<Self, DeferredError> {
        let camera_layout = single_uniform_layout(device, "Camera Layout");
        let object_layout = single_uniform_layout(device, "Object Layout");
        let light_layout = single_uniform_layout(device, "Light Camera Layout");
        let material_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Material Layout"),
                entries: &[
                    pipeline_helpers::uniform_buffer(0),
                    pipeline_helpers::texture_2d(1),
                    pipeline_helpers::texture_2d(2),
                    pipeline_helpers::texture_2d(3),
                    pipeline_helpers::filtering_sampler(4),
                ],
            });

        let camera = UniformBlock::new(device, "Camera", CameraUniform::default());
        let camera_bind_group =
            uniform_bind_group(device, "Camera Bind Group", &camera_layout, camera.buffer());
        let light_camera = UniformBlock::new(
            device,
            "Light Camera",
            LightCameraUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            },
        );
        let light_bind_group = uniform_bind_group(
            device,
            "Light Camera Bind Group",
            &light_layout,
            light_camera.buffer(),
        );

        let (source, path) = sources::GBUFFER_PASS;
        let gbuffer_shader = composer.compose(device, "GBuffer Pass", source, path)?;
        let pipelines = GeometryShading::ALL
            .iter()
            .map(|&shading| {
                let pipeline = create_mesh_pipeline(
                    device,
                    &MeshPipelineDesc {
                        label: &format!("GBuffer {shading:?}"),
                        shader: &gbuffer_shader,
                        fs_entry: shading.fs_entry(),
                        color_formats: &GBuffer::COLOR_FORMATS,
                        depth: Some(depth_write_less()),
                        bind_group_layouts: &[
                            &camera_layout,
                            &object_layout,
                            &material_layout,
                        ],
                    },
                    Vertex::layout(),
                );
                (shading, pipeline)
            })
            .collect();

        let (source, path) = sources::SHADOW_DEPTH;
        let shadow_shader = composer.compose(device, "Shadow Depth", source, path)?;
        let mut shadow_depth = depth_write_less();
        shadow_depth.bias = wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        };
        let shadow_pipeline = create_mesh_pipeline(
            device,
            &MeshPipelineDesc {
                label: "Shadow Depth",
                shader: &shadow_shader,
                fs_entry: "",
                color_formats: &[],
                depth: Some(shadow_depth),
                bind_group_layouts: &[&light_layout, &object_layout],
            },
            Vertex::layout(),
        );

        Ok(Self {
            camera,
            camera_bind_group,
            light_camera,
            light_bind_group,
            object_layout,
            material_layout,
            material_sampler: pipeline_helpers::repeat_sampler(device, "Material Sampler"),
            pipelines,
            shadow_pipeline,
        })
    }

    /// Group 2 layout for materials.
    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout
    }

    /// Sampler shared by every material.
    pub fn material_sampler(&self) -> &wgpu::Sampler {
        &self.material_sampler
    }

    /// Upload the camera used by the G-buffer fill.
    pub fn set_camera(&mut self, queue: &wgpu::Queue, camera: &Camera) {
        self.camera.write(queue, CameraUniform::from_camera(camera));
    }

    /// Upload the sun view-projection used by the shadow pass.
    pub fn set_light_view_proj(&mut self, queue: &wgpu::Queue, view_proj: Mat4) {
        self.light_camera.write(
            queue,
            LightCameraUniform {
                view_proj: view_proj.to_cols_array_2d(),
            },
        );
    }

    /// Draw `renderers`, already in render-queue order, into every
    /// G-buffer channel. Pipeline and material bind groups are only
    /// switched when they change between consecutive items. Returns the
    /// number of draws.
    ///
    /// # Errors
    ///
    /// G-buffer binding errors.
    pub fn draw_gbuffer<'r>(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        bindings: &BindingState,
        renderers: impl IntoIterator<Item = &'r RendererComponent>,
    ) -> Result<u32, DeferredError> {
        let bound = gbuffer.bind(bindings)?;
        let mut pass = bound.begin_pass(encoder, PassTargets::All)?;
        pass.set_bind_group(0, &self.camera_bind_group, &[]);

        let mut shading = None;
        let mut material = None;
        let mut draws = 0;
        for renderer in renderers {
            let m = &renderer.material;
            let s = m.shader().shading;
            if shading != Some(s) {
                if let Some(pipeline) = self.pipelines.get(&s) {
                    pass.set_pipeline(pipeline);
                }
                shading = Some(s);
            }
            if material != Some(m.id()) {
                pass.set_bind_group(2, m.bind_group(), &[]);
                material = Some(m.id());
            }
            pass.set_bind_group(1, renderer.object.bind_group(), &[]);
            renderer.mesh.draw(&mut pass);
            draws += 1;
        }
        Ok(draws)
    }

    /// Draw the shadow casters among `renderers` into the shadow map.
    /// Returns the number of draws.
    ///
    /// # Errors
    ///
    /// Shadow map binding errors.
    pub fn draw_shadows<'r>(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        shadow: &ShadowMap,
        bindings: &BindingState,
        renderers: impl IntoIterator<Item = &'r RendererComponent>,
    ) -> Result<u32, DeferredError> {
        let bound = shadow.bind(bindings)?;
        let mut pass = bound.begin_pass(encoder, PassTargets::All)?;
        pass.set_pipeline(&self.shadow_pipeline);
        pass.set_bind_group(0, &self.light_bind_group, &[]);

        let mut draws = 0;
        for renderer in renderers.into_iter().filter(|r| r.cast_shadows) {
            pass.set_bind_group(1, renderer.object.bind_group(), &[]);
            renderer.mesh.draw(&mut pass);
            draws += 1;
        }
        Ok(draws)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn object_uniform_copies_cached_matrices() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let u = ObjectUniform::from(&t);
        assert_eq!(u.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.normal_matrix, t.normal_matrix().to_cols_array_2d());
    }
}
