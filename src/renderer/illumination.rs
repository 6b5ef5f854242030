//! Deferred lighting over the G-buffer.
//!
//! Two framebuffers are involved: `illum` accumulates direct light in
//! floating point, `composite` receives the final lit image. A stage that
//! reads the composite it is about to overwrite samples a history copy
//! taken right before it (texture unit 5).
//!
//! Sun mode runs `Directional` (skipped when the sun is disabled) then
//! `Ambient`. Point mode runs `Directional` (point light only), `Hdr`
//! (Reinhard tone map) then `Ambient` over the tone-mapped result.
//!
//! Texture units: G-buffer 0-3, illumination 4, composite history 5,
//! shadow depth 30 (bound by the caller, compare-sampled). Uniform slots: sun 0, point
//! light 1 (0 for `Hdr`), stage parameters 2.

use std::cell::RefCell;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;

use super::framebuffer::Framebuffer;
use super::gbuffer::GBuffer;
use super::lights::{DirectionalLight, LightingPassUniform, PointLight};
use super::mesh::{GpuMesh, Vertex};
use super::shadow::SHADOW_UNIT;
use crate::error::DeferredError;
use crate::gpu::binding::{BindingState, BoundTexture, RenderTargetId, TextureGuard};
use crate::gpu::pipeline_helpers::{self, create_mesh_pipeline, MeshPipelineDesc};
use crate::gpu::program::{ProgramInput, ShaderProgram};
use crate::gpu::shader_composer::{sources, ShaderComposer};
use crate::gpu::texture::RenderTarget;
use crate::gpu::uniform::UniformBlock;

/// Texture unit of the illumination colour.
pub const ILLUM_UNIT: u32 = 4;
/// Texture unit of the composite history copy.
pub const HISTORY_UNIT: u32 = 5;
/// Uniform slot of the sun block.
pub const SUN_SLOT: u32 = 0;
/// Uniform slot of the point light block in the directional stage.
pub const POINT_SLOT: u32 = 1;
/// Uniform slot of the point light block in the HDR stage.
pub const HDR_POINT_SLOT: u32 = 0;
/// Uniform slot of [`LightingPassUniform`].
pub const PASS_SLOT: u32 = 2;

/// Format of the composite colour attachment.
pub const COMPOSITE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Format of the illumination colour attachment.
pub const ILLUM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// One full-screen lighting program run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingStage {
    /// Sun and/or point light into `illum`.
    Directional,
    /// Ambient term plus lit colour into `composite`.
    Ambient,
    /// Tone-mapped `illum` into `composite`.
    Hdr,
}

/// Which light drives the pass sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightingMode {
    /// Directional sun with shadows.
    #[default]
    Sun,
    /// Point light with HDR tone mapping.
    Point,
}

/// Matrices of the reference mesh overlay (`reference.wgsl`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ReferenceUniform {
    /// Camera view-projection.
    pub view_proj: [[f32; 4]; 4],
    /// Mesh world matrix.
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of `model`.
    pub normal_matrix: [[f32; 4]; 4],
    /// Sun view-projection.
    pub light_space_view_proj: [[f32; 4]; 4],
}

impl Default for ReferenceUniform {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view_proj: identity,
            model: identity,
            normal_matrix: identity,
            light_space_view_proj: identity,
        }
    }
}

struct ReferenceProgram {
    module: wgpu::ShaderModule,
    layout: wgpu::BindGroupLayout,
    uniform: UniformBlock<ReferenceUniform>,
    bind_group: wgpu::BindGroup,
    pipelines: RefCell<FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>>,
}

impl ReferenceProgram {
    fn new(device: &wgpu::Device, composer: &mut ShaderComposer) -> Result<Self, DeferredError> {
        let (source, path) = sources::REFERENCE;
        let module = composer.compose(device, "Reference Mesh", source, path)?;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Reference Layout"),
            entries: &[pipeline_helpers::uniform_buffer(0)],
        });
        let uniform = UniformBlock::new(device, "Reference", ReferenceUniform::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Reference Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.buffer().as_entire_binding(),
            }],
        });
        Ok(Self {
            module,
            layout,
            uniform,
            bind_group,
            pipelines: RefCell::new(FxHashMap::default()),
        })
    }

    fn pipeline(&self, device: &wgpu::Device, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        self.pipelines
            .borrow_mut()
            .entry(format)
            .or_insert_with(|| {
                create_mesh_pipeline(
                    device,
                    &MeshPipelineDesc {
                        label: "Reference Mesh",
                        shader: &self.module,
                        fs_entry: "fs_main",
                        color_formats: &[format],
                        depth: None,
                        bind_group_layouts: &[&self.layout],
                    },
                    Vertex::layout(),
                )
            })
            .clone()
    }
}

/// Lighting composite over a [`GBuffer`].
pub struct IlluminationBuffer {
    composite: Framebuffer,
    illum: Framebuffer,
    history: RenderTarget,
    directional: ShaderProgram,
    ambient: ShaderProgram,
    hdr: ShaderProgram,
    sun: UniformBlock<DirectionalLight>,
    point: UniformBlock<PointLight>,
    sun_pass: UniformBlock<LightingPassUniform>,
    point_pass: UniformBlock<LightingPassUniform>,
    point_ambient_pass: UniformBlock<LightingPassUniform>,
    light_space_view_proj: Mat4,
    cam_pos: Vec3,
    sun_enabled: bool,
    view_projection: Mat4,
    world: Mat4,
    normal_matrix: Mat4,
    reference: ReferenceProgram,
    reference_mesh: Option<Arc<GpuMesh>>,
}

fn lighting_inputs(extra: &[ProgramInput]) -> Vec<ProgramInput> {
    (0..4).map(ProgramInput::texture).chain(extra.iter().copied()).collect()
}

impl IlluminationBuffer {
    /// Allocate both framebuffers, compose the three programs and upload
    /// default light blocks.
    ///
    /// # Errors
    ///
    /// Shader composition or framebuffer errors.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        width: u32,
        height: u32,
    ) -> Result<Self, DeferredError> {
        let mut composite = Framebuffer::new("Composite");
        let _ = composite.add_color_target(COMPOSITE_FORMAT).add_depth_target();
        let mut illum = Framebuffer::new("Illumination");
        let _ = illum.add_color_target(ILLUM_FORMAT).add_depth_target();
        composite.init(device, width, height)?;
        illum.init(device, width, height)?;
        let history = Self::history_target(device, &composite);

        let directional = ShaderProgram::new(
            device,
            composer,
            "Directional Light",
            sources::DIRECTIONAL,
            &lighting_inputs(&[
                ProgramInput::depth(SHADOW_UNIT),
                ProgramInput::shadow_sampler(),
                ProgramInput::uniform(SUN_SLOT),
                ProgramInput::uniform(POINT_SLOT),
                ProgramInput::uniform(PASS_SLOT),
            ]),
        )?;
        let ambient = ShaderProgram::new(
            device,
            composer,
            "Ambient Light",
            sources::AMBIENT,
            &lighting_inputs(&[
                ProgramInput::texture(ILLUM_UNIT),
                ProgramInput::texture(HISTORY_UNIT),
                ProgramInput::uniform(SUN_SLOT),
                ProgramInput::uniform(PASS_SLOT),
            ]),
        )?;
        let hdr = ShaderProgram::new(
            device,
            composer,
            "HDR Tone Map",
            sources::HDR,
            &lighting_inputs(&[
                ProgramInput::texture(ILLUM_UNIT),
                ProgramInput::texture(HISTORY_UNIT),
                ProgramInput::uniform(HDR_POINT_SLOT),
            ]),
        )?;

        let pass = |label: &str| {
            UniformBlock::new(
                device,
                label,
                LightingPassUniform::new(Mat4::IDENTITY, Vec3::ZERO, false, false, false),
            )
        };
        log::debug!("illumination buffer ready at {width}x{height}");
        Ok(Self {
            composite,
            illum,
            history,
            directional,
            ambient,
            hdr,
            sun: UniformBlock::new(device, "Sun", DirectionalLight::default()),
            point: UniformBlock::new(device, "Point Light", PointLight::default()),
            sun_pass: pass("Sun Pass"),
            point_pass: pass("Point Pass"),
            point_ambient_pass: pass("Point Ambient Pass"),
            light_space_view_proj: Mat4::IDENTITY,
            cam_pos: Vec3::ZERO,
            sun_enabled: true,
            view_projection: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            reference: ReferenceProgram::new(device, composer)?,
            reference_mesh: None,
        })
    }

    fn history_target(device: &wgpu::Device, composite: &Framebuffer) -> RenderTarget {
        let (w, h) = composite.size();
        RenderTarget::new(device, "Composite History", w, h, COMPOSITE_FORMAT)
    }

    /// Reallocate both framebuffers and the history copy.
    ///
    /// # Errors
    ///
    /// See [`Framebuffer::init`].
    pub fn init(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<(), DeferredError> {
        self.composite.init(device, width, height)?;
        self.illum.init(device, width, height)?;
        self.history = Self::history_target(device, &self.composite);
        Ok(())
    }

    /// Final lit image.
    pub fn composite(&self) -> &Framebuffer {
        &self.composite
    }

    /// Accumulated direct light.
    pub fn illum(&self) -> &Framebuffer {
        &self.illum
    }

    /// Stages a call in `mode` will run, in order.
    pub fn stages(&self, mode: LightingMode) -> Vec<LightingStage> {
        match mode {
            LightingMode::Sun if self.sun_enabled => {
                vec![LightingStage::Directional, LightingStage::Ambient]
            }
            LightingMode::Sun => vec![LightingStage::Ambient],
            LightingMode::Point => vec![
                LightingStage::Directional,
                LightingStage::Hdr,
                LightingStage::Ambient,
            ],
        }
    }

    /// Clear both framebuffers.
    ///
    /// # Errors
    ///
    /// See [`Framebuffer::clear`].
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder, bindings: &BindingState) -> Result<(), DeferredError> {
        self.composite.clear(encoder, bindings)?;
        self.illum.clear(encoder, bindings)
    }

    fn upload(&mut self, queue: &wgpu::Queue) {
        self.sun.upload(queue);
        self.point.upload(queue);
        let (lsvp, cam) = (self.light_space_view_proj, self.cam_pos);
        self.sun_pass
            .write(queue, LightingPassUniform::new(lsvp, cam, true, true, false));
        self.point_pass
            .write(queue, LightingPassUniform::new(lsvp, cam, false, true, false));
        self.point_ambient_pass
            .write(queue, LightingPassUniform::new(lsvp, cam, false, true, true));
    }

    /// Sun lighting: directional stage (when enabled) then ambient, leaving
    /// the lit image in [`composite`](Self::composite). The shadow map must
    /// already be bound at texture unit 30. Returns the stages run.
    ///
    /// # Errors
    ///
    /// [`DeferredError::UnboundTexture`] if the shadow map is missing, or
    /// any binding error.
    pub fn apply_effect(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        bindings: &BindingState,
    ) -> Result<Vec<LightingStage>, DeferredError> {
        self.run(LightingMode::Sun, device, queue, encoder, gbuffer, bindings)
    }

    /// Point-light lighting: directional (point only), HDR, ambient.
    ///
    /// # Errors
    ///
    /// As [`apply_effect`](Self::apply_effect).
    pub fn apply_point_effect(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        bindings: &BindingState,
    ) -> Result<Vec<LightingStage>, DeferredError> {
        self.run(LightingMode::Point, device, queue, encoder, gbuffer, bindings)
    }

    fn run(
        &mut self,
        mode: LightingMode,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        bindings: &BindingState,
    ) -> Result<Vec<LightingStage>, DeferredError> {
        self.upload(queue);
        let stages = self.stages(mode);
        for &stage in &stages {
            log::trace!("lighting stage {stage:?} ({mode:?})");
            match stage {
                LightingStage::Directional => self.directional_stage(mode, device, encoder, gbuffer, bindings)?,
                LightingStage::Ambient => self.ambient_stage(mode, device, encoder, gbuffer, bindings)?,
                LightingStage::Hdr => self.hdr_stage(device, encoder, gbuffer, bindings)?,
            }
        }
        Ok(stages)
    }

    fn bind_history<'b>(&self, bindings: &'b BindingState) -> TextureGuard<'b> {
        bindings.textures.bind(
            HISTORY_UNIT,
            BoundTexture {
                view: self.history.view.clone(),
                owner: None,
            },
        )
    }

    fn directional_stage(
        &self,
        mode: LightingMode,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let pass = match mode {
            LightingMode::Sun => &self.sun_pass,
            LightingMode::Point => &self.point_pass,
        };
        let _sun = self.sun.bind(bindings, SUN_SLOT);
        let _point = self.point.bind(bindings, POINT_SLOT);
        let _pass = pass.bind(bindings, PASS_SLOT);
        let _gbuffer = gbuffer.bind_lighting(bindings)?;
        self.illum.render_to_fsq(device, encoder, &self.directional, bindings)
    }

    fn ambient_stage(
        &self,
        mode: LightingMode,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let pass = match mode {
            LightingMode::Sun => &self.sun_pass,
            LightingMode::Point => &self.point_ambient_pass,
        };
        self.composite.copy_color_to(encoder, 0, &self.history)?;
        let _sun = self.sun.bind(bindings, SUN_SLOT);
        let _pass = pass.bind(bindings, PASS_SLOT);
        let _gbuffer = gbuffer.bind_lighting(bindings)?;
        let _illum = self.illum.bind_color_as_texture(0, ILLUM_UNIT, bindings)?;
        let _history = self.bind_history(bindings);
        self.composite.render_to_fsq(device, encoder, &self.ambient, bindings)
    }

    fn hdr_stage(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        self.composite.copy_color_to(encoder, 0, &self.history)?;
        let _point = self.point.bind(bindings, HDR_POINT_SLOT);
        let _gbuffer = gbuffer.bind_lighting(bindings)?;
        let _illum = self.illum.bind_color_as_texture(0, ILLUM_UNIT, bindings)?;
        let _history = self.bind_history(bindings);
        self.composite.render_to_fsq(device, encoder, &self.hdr, bindings)
    }

    /// Debug view: the HDR program over `illum` into `view`, then the
    /// reference mesh (if any) drawn on top with the cached matrices.
    ///
    /// # Errors
    ///
    /// Binding or program errors.
    pub fn draw_illum_buffer(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        bindings: &BindingState,
        (view, format): (&wgpu::TextureView, wgpu::TextureFormat),
    ) -> Result<(), DeferredError> {
        {
            let _point = self.point.bind(bindings, HDR_POINT_SLOT);
            let _gbuffer = gbuffer.bind_lighting(bindings)?;
            let _illum = self.illum.bind_color_as_texture(0, ILLUM_UNIT, bindings)?;
            let _history = self.bind_history(bindings);
            Framebuffer::draw_fullscreen_quad(device, encoder, view, format, &self.hdr, bindings)?;
        }

        let Some(mesh) = &self.reference_mesh else {
            return Ok(());
        };
        queue.write_buffer(
            self.reference.uniform.buffer(),
            0,
            bytemuck::bytes_of(&ReferenceUniform {
                view_proj: self.view_projection.to_cols_array_2d(),
                model: self.world.to_cols_array_2d(),
                normal_matrix: self.normal_matrix.to_cols_array_2d(),
                light_space_view_proj: self.light_space_view_proj.to_cols_array_2d(),
            }),
        );
        let _screen = bindings.targets.bind(RenderTargetId::SCREEN);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Reference Mesh"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.reference.pipeline(device, format));
        pass.set_bind_group(0, &self.reference.bind_group, &[]);
        mesh.draw(&mut pass);
        Ok(())
    }

    // -- Setters --

    /// Replace the sun block.
    pub fn set_sun(&mut self, sun: DirectionalLight) {
        self.sun.set(sun);
    }

    /// Set only the sun direction and colour.
    pub fn set_sun_direction_color(&mut self, direction: Vec3, color: Vec3) {
        let sun = self.sun.get_mut();
        sun.set_direction(direction);
        sun.color = color.extend(1.0).to_array();
    }

    /// Mutable sun block; uploaded on the next apply.
    pub fn sun_mut(&mut self) -> &mut DirectionalLight {
        self.sun.get_mut()
    }

    /// Current sun block.
    pub fn sun(&self) -> &DirectionalLight {
        self.sun.get()
    }

    /// Sun uniform block as last uploaded.
    pub fn sun_block(&self) -> &UniformBlock<DirectionalLight> {
        &self.sun
    }

    /// Replace the point light block.
    pub fn set_point_light(&mut self, point: PointLight) {
        self.point.set(point);
    }

    /// Mutable point light block; uploaded on the next apply.
    pub fn point_light_mut(&mut self) -> &mut PointLight {
        self.point.get_mut()
    }

    /// Current point light block.
    pub fn point_light(&self) -> &PointLight {
        self.point.get()
    }

    /// Sun view-projection used for shadow lookups.
    pub fn set_light_space_view_proj(&mut self, matrix: Mat4) {
        self.light_space_view_proj = matrix;
    }

    /// Cached sun view-projection.
    pub fn light_space_view_proj(&self) -> Mat4 {
        self.light_space_view_proj
    }

    /// Camera world position for specular terms.
    pub fn set_cam_pos(&mut self, position: Vec3) {
        self.cam_pos = position;
    }

    /// Cached camera position.
    pub fn cam_pos(&self) -> Vec3 {
        self.cam_pos
    }

    /// Turn the directional stage on or off in sun mode.
    pub fn enable_sun(&mut self, enabled: bool) {
        self.sun_enabled = enabled;
    }

    /// Whether the directional stage runs in sun mode.
    pub fn sun_enabled(&self) -> bool {
        self.sun_enabled
    }

    /// Camera view-projection for the reference overlay.
    pub fn set_view_projection(&mut self, matrix: Mat4) {
        self.view_projection = matrix;
    }

    /// World matrix of the reference overlay; the normal matrix is derived.
    pub fn set_transform(&mut self, world: Mat4) {
        self.world = world;
        self.normal_matrix = world.inverse().transpose();
    }

    /// Mesh drawn by [`draw_illum_buffer`](Self::draw_illum_buffer).
    pub fn set_reference_mesh(&mut self, mesh: Option<Arc<GpuMesh>>) {
        self.reference_mesh = mesh;
    }
}

const _: () = assert!(size_of::<ReferenceUniform>() == 256);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::render_context::RenderContext;
    use crate::renderer::shadow::ShadowMap;

    fn setup() -> Option<(RenderContext, ShaderComposer, GBuffer, IlluminationBuffer)> {
        let ctx = pollster::block_on(RenderContext::headless(32, 32)).ok()?;
        let mut composer = ShaderComposer::new().unwrap();
        let gbuffer = GBuffer::new(&ctx.device, 32, 32).unwrap();
        let illum = IlluminationBuffer::new(&ctx.device, &mut composer, 32, 32).unwrap();
        Some((ctx, composer, gbuffer, illum))
    }

    #[test]
    fn disabled_sun_skips_directional_stage() {
        let Some((ctx, _composer, gbuffer, mut illum)) = setup() else {
            return;
        };
        assert_eq!(
            illum.stages(LightingMode::Sun),
            [LightingStage::Directional, LightingStage::Ambient]
        );
        illum.enable_sun(false);
        assert_eq!(illum.stages(LightingMode::Sun), [LightingStage::Ambient]);
        assert_eq!(
            illum.stages(LightingMode::Point),
            [LightingStage::Directional, LightingStage::Hdr, LightingStage::Ambient]
        );

        // With the sun off the shadow map is never sampled.
        let bindings = BindingState::default();
        let mut encoder = ctx.create_encoder();
        let ran = illum
            .apply_effect(&ctx.device, &ctx.queue, &mut encoder, &gbuffer, &bindings)
            .unwrap();
        ctx.submit(encoder);
        assert_eq!(ran, [LightingStage::Ambient]);
        assert!(bindings.textures.bound_slots().is_empty());
        assert!(bindings.uniforms.bound_slots().is_empty());
        assert_eq!(bindings.targets.current(), RenderTargetId::SCREEN);
    }

    #[test]
    fn directional_stage_requires_shadow_map() {
        let Some((ctx, _composer, gbuffer, mut illum)) = setup() else {
            return;
        };
        let bindings = BindingState::default();
        let mut encoder = ctx.create_encoder();
        let err = illum
            .apply_effect(&ctx.device, &ctx.queue, &mut encoder, &gbuffer, &bindings)
            .unwrap_err();
        assert!(matches!(err, DeferredError::UnboundTexture(SHADOW_UNIT)));
        // Guards unwound on the error path.
        assert!(bindings.textures.bound_slots().is_empty());
        assert_eq!(bindings.targets.current(), RenderTargetId::SCREEN);

        let shadow = ShadowMap::new(&ctx.device, 64).unwrap();
        let _shadow = shadow.bind_for_lighting(&bindings).unwrap();
        let mut encoder = ctx.create_encoder();
        let ran = illum
            .apply_point_effect(&ctx.device, &ctx.queue, &mut encoder, &gbuffer, &bindings)
            .unwrap();
        ctx.submit(encoder);
        assert_eq!(ran.len(), 3);
        assert_eq!(bindings.textures.bound_slots(), [SHADOW_UNIT]);
    }

    #[test]
    fn shadowed_directional_stage_raises_no_gpu_errors() {
        let Some((ctx, _composer, gbuffer, mut illum)) = setup() else {
            return;
        };
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        ctx.device.push_error_scope(wgpu::ErrorFilter::Internal);
        let bindings = BindingState::default();
        let shadow = ShadowMap::new(&ctx.device, 64).unwrap();
        let _shadow = shadow.bind_for_lighting(&bindings).unwrap();
        let mut encoder = ctx.create_encoder();
        let ran = illum
            .apply_effect(&ctx.device, &ctx.queue, &mut encoder, &gbuffer, &bindings)
            .unwrap();
        ctx.submit(encoder);
        assert_eq!(ran, [LightingStage::Directional, LightingStage::Ambient]);

        let internal = pollster::block_on(ctx.device.pop_error_scope());
        let validation = pollster::block_on(ctx.device.pop_error_scope());
        assert!(internal.is_none(), "internal error: {internal:?}");
        assert!(validation.is_none(), "validation error: {validation:?}");
    }

    #[test]
    fn setters_update_cached_state() {
        let Some((_ctx, _composer, _gbuffer, mut illum)) = setup() else {
            return;
        };
        illum.set_sun_direction_color(Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.0, 0.5, 0.25));
        assert_eq!(illum.sun().direction, [0.0, 0.0, -1.0, 0.0]);
        assert_eq!(illum.sun().color, [1.0, 0.5, 0.25, 1.0]);
        illum.point_light_mut().ambient_power = 0.0;
        assert_eq!(illum.point_light().ambient_power, 0.0);
        illum.set_cam_pos(Vec3::ONE);
        assert_eq!(illum.cam_pos(), Vec3::ONE);
    }
}
