//! Per-frame orchestration: clear, transforms, shadow, geometry, lighting,
//! post effect, present.

mod frame;

use std::path::Path;
use std::sync::Arc;

pub use frame::{DisplayMode, FramePass, PassLog};
use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::error::DeferredError;
use crate::gpu::binding::BindingState;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::input::{ActionPoller, KeyAction, KeyboardState};
use crate::options::Options;
use crate::renderer::{
    DebugViews, Framebuffer, GBuffer, GBufferChannel, GeometryPass, GpuMesh,
    IlluminationBuffer, LightingMode, PostEffect, ShadowMap,
};
use crate::scene::{
    GeometryShading, MaterialDesc, MaterialRegistry, RendererComponent, Scene,
    ShaderHandle, ShaderMaterial, Transform,
};
use crate::util::frame_timing::FrameTiming;

/// The deferred renderer and everything it owns on the GPU.
///
/// # Frame loop
///
/// Call [`render`](Self::render) once per frame to draw and present, or
/// [`render_to_view`](Self::render_to_view) to draw into a caller-owned
/// texture. Call [`resize`](Self::resize) when the window size changes:
/// only the camera and the surface follow, framebuffers keep the size they
/// were created with.
///
/// # Input
///
/// Forward key events with [`key_down`](Self::key_down) /
/// [`key_up`](Self::key_up); bound toggles are polled once per frame.
pub struct DeferredRenderer {
    /// Core wgpu device, queue and surface.
    pub context: RenderContext,
    bindings: BindingState,
    gbuffer: GBuffer,
    illumination: IlluminationBuffer,
    shadow: ShadowMap,
    geometry: GeometryPass,
    post: PostEffect,
    debug_views: DebugViews,
    materials: MaterialRegistry,
    shaders: FxHashMap<GeometryShading, ShaderHandle>,
    options: Options,
    pass_log: PassLog,
    display_mode: DisplayMode,
    lighting_mode: LightingMode,
    keyboard: KeyboardState,
    actions: ActionPoller,
    /// Per-frame timing and FPS tracking.
    pub frame_timing: FrameTiming,
}

// =============================================================================
// Construction
// =============================================================================

impl DeferredRenderer {
    /// Build every pass at the context's current size and apply `options`.
    /// LUT paths in the options are resolved against `asset_dir`.
    ///
    /// # Errors
    ///
    /// Shader composition, framebuffer or LUT loading failures.
    pub fn new(
        context: RenderContext,
        options: Options,
        asset_dir: &Path,
    ) -> Result<Self, DeferredError> {
        let (width, height) = (context.width(), context.height());
        let device = &context.device;
        let mut composer = ShaderComposer::new()?;

        let gbuffer = GBuffer::new(device, width, height)?;
        let illumination =
            IlluminationBuffer::new(device, &mut composer, width, height)?;
        let shadow = ShadowMap::new(device, options.shadow.resolution)?;
        let geometry = GeometryPass::new(device, &mut composer)?;
        let post = PostEffect::new(
            device,
            &context.queue,
            &mut composer,
            (width, height),
            options.post_processing.effect_kind(asset_dir)?,
        )?;
        let debug_views = DebugViews::new(device, &mut composer)?;

        let mut materials = MaterialRegistry::new();
        let shaders = GeometryShading::ALL
            .iter()
            .map(|&s| (s, materials.register_shader(s)))
            .collect();

        log::info!("deferred renderer ready at {width}x{height}");
        let mut renderer = Self {
            context,
            bindings: BindingState::default(),
            gbuffer,
            illumination,
            shadow,
            geometry,
            post,
            debug_views,
            materials,
            shaders,
            options: Options::default(),
            pass_log: PassLog::default(),
            display_mode: DisplayMode::Composited,
            lighting_mode: LightingMode::Sun,
            keyboard: KeyboardState::default(),
            actions: ActionPoller::default(),
            frame_timing: FrameTiming::new(options.debug.target_fps),
        };
        renderer.apply_lighting_options(&options);
        renderer.options = options;
        Ok(renderer)
    }

    fn apply_lighting_options(&mut self, options: &Options) {
        let lighting = &options.lighting;
        self.illumination.set_sun(lighting.sun());
        self.illumination.set_point_light(lighting.point_light());
        self.illumination.enable_sun(lighting.sun_enabled);
        self.lighting_mode = if lighting.point_mode {
            LightingMode::Point
        } else {
            LightingMode::Sun
        };
    }

    /// Replace the options: lights, lighting mode, post effect and key
    /// bindings take effect immediately. The shadow resolution is fixed at
    /// construction.
    ///
    /// # Errors
    ///
    /// LUT loading failures; the previous options stay active.
    pub fn set_options(
        &mut self,
        options: Options,
        asset_dir: &Path,
    ) -> Result<(), DeferredError> {
        let kind = options.post_processing.effect_kind(asset_dir)?;
        self.post.set_kind(&self.context.device, &self.context.queue, kind);
        self.apply_lighting_options(&options);
        self.options = options;
        Ok(())
    }

    // -- Accessors --

    /// Current options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The G-buffer.
    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// The illumination composite.
    pub fn illumination(&self) -> &IlluminationBuffer {
        &self.illumination
    }

    /// Mutable illumination composite (light setters).
    pub fn illumination_mut(&mut self) -> &mut IlluminationBuffer {
        &mut self.illumination
    }

    /// The post effect.
    pub fn post_effect(&self) -> &PostEffect {
        &self.post
    }

    /// Mutable post effect.
    pub fn post_effect_mut(&mut self) -> &mut PostEffect {
        &mut self.post
    }

    /// The sun shadow map.
    pub fn shadow(&self) -> &ShadowMap {
        &self.shadow
    }

    /// Passes executed in the last frame.
    pub fn pass_log(&self) -> &PassLog {
        &self.pass_log
    }

    /// Buffer currently presented.
    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// Select the presented buffer.
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        log::info!("display mode: {mode:?}");
        self.display_mode = mode;
    }

    /// Active lighting sequence.
    pub fn lighting_mode(&self) -> LightingMode {
        self.lighting_mode
    }

    /// Switch the lighting sequence.
    pub fn set_lighting_mode(&mut self, mode: LightingMode) {
        self.lighting_mode = mode;
    }

    // -- Scene content --

    /// Handle of the registered shader for `shading`.
    pub fn shader(&self, shading: GeometryShading) -> Option<ShaderHandle> {
        self.shaders.get(&shading).copied()
    }

    /// Create a material with the next creation-order id.
    pub fn create_material(
        &mut self,
        shading: GeometryShading,
        desc: MaterialDesc,
    ) -> Option<Arc<ShaderMaterial>> {
        let shader = self.shader(shading)?;
        Some(Arc::new(self.materials.create_material(
            &self.context.device,
            &self.context.queue,
            &self.geometry,
            shader,
            desc,
        )))
    }

    /// Renderable component for `mesh` drawn with `material`.
    pub fn create_renderer(
        &self,
        mesh: Arc<GpuMesh>,
        material: Arc<ShaderMaterial>,
        cast_shadows: bool,
    ) -> RendererComponent {
        RendererComponent::new(
            &self.context.device,
            &self.geometry,
            mesh,
            material,
            cast_shadows,
        )
    }

    /// Mesh and transform shown by the illumination debug view.
    pub fn set_reference(&mut self, mesh: Option<Arc<GpuMesh>>, transform: &Transform) {
        self.illumination.set_reference_mesh(mesh);
        self.illumination.set_transform(transform.world_matrix());
    }
}

// =============================================================================
// Input
// =============================================================================

impl DeferredRenderer {
    /// Record a key press (winit `KeyCode` debug name).
    pub fn key_down(&mut self, key: &str) {
        self.keyboard.key_down(key);
    }

    /// Record a key release.
    pub fn key_up(&mut self, key: &str) {
        self.keyboard.key_up(key);
    }

    /// Forget held keys, e.g. when the window loses focus.
    pub fn release_keys(&mut self) {
        self.keyboard.release_all();
    }

    /// Movement axes from the held keys.
    pub fn move_input(&self) -> Vec3 {
        self.keyboard.axis_input()
    }

    /// Poll bound toggles and apply the ones that fired. Nothing fires
    /// while `ui_has_focus`.
    pub fn poll_actions(&mut self, scene: &mut Scene, ui_has_focus: bool) -> Vec<KeyAction> {
        let fired =
            self.actions
                .poll(&self.keyboard, &self.options.keybindings, ui_has_focus);
        for &action in &fired {
            self.handle_action(action, scene);
        }
        fired
    }

    /// Apply a single action.
    pub fn handle_action(&mut self, action: KeyAction, scene: &mut Scene) {
        log::debug!("action {action:?}");
        match action {
            KeyAction::CycleSelectionNext => {
                let _ = scene.cycle_selection(true);
            }
            KeyAction::CycleSelectionPrev => {
                let _ = scene.cycle_selection(false);
            }
            KeyAction::ToggleOrtho => {
                if let Some(mut camera) = scene.camera_mut() {
                    camera.toggle_ortho();
                }
            }
            KeyAction::ToggleGBufferView => {
                self.set_display_mode(self.display_mode.toggle(DisplayMode::GBuffer));
            }
            KeyAction::ToggleIllumView => {
                self.set_display_mode(
                    self.display_mode.toggle(DisplayMode::Illumination),
                );
            }
            KeyAction::ToggleColorView => {
                self.set_display_mode(self.display_mode.toggle(DisplayMode::Color));
            }
            KeyAction::ToggleRelative => {
                if let Some(relative) = scene.toggle_relative() {
                    log::info!("relative movement: {relative}");
                }
            }
        }
    }
}

// =============================================================================
// Frame
// =============================================================================

impl DeferredRenderer {
    /// Render one frame to the surface and present it.
    ///
    /// # Errors
    ///
    /// [`DeferredError::Surface`] if no swapchain texture is available, or
    /// any pass error.
    pub fn render(&mut self, scene: &mut Scene) -> Result<(), DeferredError> {
        if !self.frame_timing.should_render() {
            return Ok(());
        }
        let dt = self.frame_timing.tick();
        let move_input = self.move_input();

        let frame = self.context.get_next_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let format = self.context.format();
        self.render_to_view(scene, dt, move_input, (&view, format))?;
        frame.present();
        Ok(())
    }

    /// Run every pass of a frame into `target` and submit.
    ///
    /// # Errors
    ///
    /// Binding, program or pass-order errors.
    pub fn render_to_view(
        &mut self,
        scene: &mut Scene,
        dt: f32,
        move_input: Vec3,
        target: (&wgpu::TextureView, wgpu::TextureFormat),
    ) -> Result<(), DeferredError> {
        let mut encoder = self.context.create_encoder();
        self.pass_log.begin_frame();

        self.clear_pass(&mut encoder)?;
        self.transform_pass(scene, dt, move_input)?;

        let queue = scene.render_queue();
        let world = scene.world();
        let renderers: Vec<&RendererComponent> = queue
            .iter()
            .filter_map(|&e| world.get::<RendererComponent>(e))
            .collect();

        self.pass_log.record(FramePass::Shadow)?;
        let shadow_draws = self.geometry.draw_shadows(
            &mut encoder,
            &self.shadow,
            &self.bindings,
            renderers.iter().copied(),
        )?;

        self.pass_log.record(FramePass::Geometry)?;
        let draws = self.geometry.draw_gbuffer(
            &mut encoder,
            &self.gbuffer,
            &self.bindings,
            renderers.iter().copied(),
        )?;
        log::trace!("geometry: {draws} draws, shadow: {shadow_draws} draws");

        self.lighting_pass(&mut encoder)?;

        self.pass_log.record(FramePass::Post)?;
        self.post.apply(
            &self.context.device,
            &self.context.queue,
            &mut encoder,
            self.illumination.composite(),
            &self.bindings,
        )?;

        self.present_pass(&mut encoder, target)?;
        self.context.submit(encoder);
        Ok(())
    }

    fn clear_pass(&mut self, encoder: &mut wgpu::CommandEncoder) -> Result<(), DeferredError> {
        self.pass_log.record(FramePass::Clear)?;
        self.gbuffer.clear(encoder, &self.bindings)?;
        self.illumination.clear(encoder, &self.bindings)?;
        self.shadow.clear(encoder, &self.bindings)?;
        self.post.clear(encoder, &self.bindings)
    }

    fn transform_pass(
        &mut self,
        scene: &mut Scene,
        dt: f32,
        move_input: Vec3,
    ) -> Result<(), DeferredError> {
        self.pass_log.record(FramePass::Transforms)?;
        scene.update_transforms(dt, move_input);

        let queue = &self.context.queue;
        let world = scene.world_mut();
        let mut objects = world.query::<(&Transform, &mut RendererComponent)>();
        for (transform, mut renderer) in objects.iter_mut(world) {
            renderer.sync(queue, transform);
        }

        let camera = scene.camera().cloned().unwrap_or_default();
        self.geometry.set_camera(queue, &camera);
        self.illumination.set_cam_pos(camera.eye);
        self.illumination.set_view_projection(camera.view_projection());

        let shadow = &self.options.shadow;
        let light_view_proj = self.illumination.sun().light_space_view_proj(
            camera.target,
            shadow.half_extent,
            shadow.distance,
        );
        self.geometry.set_light_view_proj(queue, light_view_proj);
        self.illumination.set_light_space_view_proj(light_view_proj);
        Ok(())
    }

    fn lighting_pass(&mut self, encoder: &mut wgpu::CommandEncoder) -> Result<(), DeferredError> {
        self.pass_log.record(FramePass::Lighting)?;
        let _shadow = self.shadow.bind_for_lighting(&self.bindings)?;
        let device = &self.context.device;
        let queue = &self.context.queue;
        let stages = match self.lighting_mode {
            LightingMode::Sun => self.illumination.apply_effect(
                device,
                queue,
                encoder,
                &self.gbuffer,
                &self.bindings,
            )?,
            LightingMode::Point => self.illumination.apply_point_effect(
                device,
                queue,
                encoder,
                &self.gbuffer,
                &self.bindings,
            )?,
        };
        log::trace!("lighting stages: {stages:?}");
        Ok(())
    }

    fn present_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target: (&wgpu::TextureView, wgpu::TextureFormat),
    ) -> Result<(), DeferredError> {
        self.pass_log.record(FramePass::Present)?;
        let device = &self.context.device;
        let views = &self.debug_views;
        let bindings = &self.bindings;
        match self.display_mode {
            DisplayMode::Composited => {
                let (view, format) = target;
                let _output = self.post.output().bind_color_as_texture(0, 0, bindings)?;
                Framebuffer::draw_fullscreen_quad(
                    device,
                    encoder,
                    view,
                    format,
                    &views.passthrough,
                    bindings,
                )
            }
            DisplayMode::GBuffer => {
                self.gbuffer
                    .draw_buffers_to_screen(device, encoder, target, views, bindings)
            }
            DisplayMode::Illumination => self.illumination.draw_illum_buffer(
                device,
                &self.context.queue,
                encoder,
                &self.gbuffer,
                bindings,
                target,
            ),
            DisplayMode::Color => self.gbuffer.draw_channel(
                GBufferChannel::Albedo,
                device,
                encoder,
                target,
                views,
                bindings,
            ),
            DisplayMode::Normal => self.gbuffer.draw_channel(
                GBufferChannel::Normal,
                device,
                encoder,
                target,
                views,
                bindings,
            ),
            DisplayMode::Position => self.gbuffer.draw_channel(
                GBufferChannel::Position,
                device,
                encoder,
                target,
                views,
                bindings,
            ),
            DisplayMode::Depth => {
                self.gbuffer.draw_depth(device, encoder, target, views, bindings)
            }
        }
    }

    /// Follow a window resize: the surface and the camera aspect update,
    /// framebuffers keep their allocated size.
    pub fn resize(&mut self, scene: &mut Scene, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.context.resize(width, height);
            if let Some(mut camera) = scene.camera_mut() {
                camera.resize_window(width, height);
            }
            log::debug!(
                "resized surface to {width}x{height}; framebuffers stay at {:?}",
                self.gbuffer.size()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::readback;
    use crate::gpu::texture::RenderTarget;
    use crate::renderer::lights::DirectionalLight;
    use crate::renderer::MeshBuilder;

    const SIZE: u32 = 64;

    fn renderer() -> Option<DeferredRenderer> {
        let context = pollster::block_on(RenderContext::headless(SIZE, SIZE)).ok()?;
        let mut options = Options::default();
        options.shadow.resolution = 256;
        Some(DeferredRenderer::new(context, options, Path::new("assets")).unwrap())
    }

    fn cube_scene(renderer: &mut DeferredRenderer) -> Scene {
        let mut scene = Scene::new();
        if let Some(mut camera) = scene.camera_mut() {
            camera.eye = Vec3::new(0.0, 0.0, 5.0);
            camera.target = Vec3::ZERO;
            camera.resize_window(SIZE, SIZE);
        }
        let mesh = Arc::new(
            MeshBuilder::new()
                .add_cube(Vec3::ZERO, Vec3::ONE, [1.0; 4])
                .bake(&renderer.context.device, "Cube"),
        );
        let material = renderer
            .create_material(GeometryShading::Textured, MaterialDesc::default())
            .unwrap();
        let cube = scene.create_entity("cube");
        let component = renderer.create_renderer(mesh, material, true);
        assert!(scene.insert(cube, component));
        scene
    }

    /// Render one frame into an offscreen target and read it back. Any
    /// validation or internal error raised on the way fails the test.
    fn render_pixels(renderer: &mut DeferredRenderer, scene: &mut Scene) -> Vec<u8> {
        let device = renderer.context.device.clone();
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        device.push_error_scope(wgpu::ErrorFilter::Internal);
        let target = RenderTarget::new(
            &device,
            "Test Output",
            SIZE,
            SIZE,
            wgpu::TextureFormat::Rgba8Unorm,
        );
        renderer
            .render_to_view(scene, 0.0, Vec3::ZERO, (&target.view, target.format()))
            .unwrap();
        let pixels =
            readback::copy_texture_rgba8(&device, &renderer.context.queue, &target.texture)
                .unwrap();
        let internal = pollster::block_on(device.pop_error_scope());
        let validation = pollster::block_on(device.pop_error_scope());
        assert!(internal.is_none(), "internal error: {internal:?}");
        assert!(validation.is_none(), "validation error: {validation:?}");
        pixels
    }

    fn center_luminance(renderer: &mut DeferredRenderer, scene: &mut Scene) -> u32 {
        let pixels = render_pixels(renderer, scene);
        let i = ((SIZE / 2 * SIZE + SIZE / 2) * 4) as usize;
        pixels[i..i + 3].iter().map(|&c| u32::from(c)).sum()
    }

    fn total_luminance(renderer: &mut DeferredRenderer, scene: &mut Scene) -> u64 {
        render_pixels(renderer, scene)
            .chunks_exact(4)
            .flat_map(|px| &px[..3])
            .map(|&c| u64::from(c))
            .sum()
    }

    #[test]
    fn sun_lights_the_cube_and_darkness_stays_dark() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let mut scene = cube_scene(&mut renderer);

        let mut sun = DirectionalLight::default();
        sun.set_direction(Vec3::new(0.0, 0.0, -1.0));
        renderer.illumination_mut().set_sun(sun);
        assert!(center_luminance(&mut renderer, &mut scene) > 0);
        assert_eq!(renderer.pass_log().passes().len(), 7);

        let dark = DirectionalLight {
            ambient_power: 0.0,
            ..sun
        };
        renderer.illumination_mut().set_sun(dark);
        renderer.illumination_mut().enable_sun(false);
        assert_eq!(center_luminance(&mut renderer, &mut scene), 0);
    }

    #[test]
    fn every_display_mode_renders() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let mut scene = cube_scene(&mut renderer);
        let mut sun = DirectionalLight::default();
        sun.set_direction(Vec3::new(0.0, 0.0, -1.0));
        renderer.illumination_mut().set_sun(sun);
        for mode in DisplayMode::ALL {
            renderer.set_display_mode(mode);
            let luminance = total_luminance(&mut renderer, &mut scene);
            assert!(renderer.pass_log().has_run(FramePass::Present));
            assert!(luminance > 0, "{mode:?} rendered a black frame");
        }
    }

    #[test]
    fn depth_view_shows_the_cube_nearer_than_the_background() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let mut scene = cube_scene(&mut renderer);
        renderer.set_display_mode(DisplayMode::Depth);
        let pixels = render_pixels(&mut renderer, &mut scene);
        let center = ((SIZE / 2 * SIZE + SIZE / 2) * 4) as usize;
        // Uncovered pixels read as the cleared depth, which is white.
        assert_eq!(pixels[0], 255);
        assert!(pixels[center] < 255);
    }

    #[test]
    fn resize_keeps_framebuffer_size() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let mut scene = Scene::new();
        renderer.resize(&mut scene, 200, 100);
        assert_eq!(renderer.gbuffer().size(), (SIZE, SIZE));
        assert_eq!(renderer.illumination().composite().size(), (SIZE, SIZE));
        assert_eq!(scene.camera().unwrap().aspect, 2.0);
    }

    #[test]
    fn light_block_reads_back_what_was_set() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let mut scene = cube_scene(&mut renderer);
        let mut sun = DirectionalLight::default();
        sun.set_direction(Vec3::new(0.0, -1.0, 0.0));
        sun.ambient_power = 0.25;
        renderer.illumination_mut().set_sun(sun);
        let _ = center_luminance(&mut renderer, &mut scene);

        let uploaded = renderer
            .illumination()
            .sun_block()
            .read_back(&renderer.context.device, &renderer.context.queue)
            .unwrap();
        assert_eq!(uploaded, sun);
    }

    #[test]
    fn toggles_switch_display_and_projection() {
        let Some(mut renderer) = renderer() else {
            return;
        };
        let mut scene = Scene::new();
        renderer.key_down("F2");
        let fired = renderer.poll_actions(&mut scene, false);
        assert_eq!(fired, [KeyAction::ToggleIllumView]);
        assert_eq!(renderer.display_mode(), DisplayMode::Illumination);

        renderer.key_up("F2");
        renderer.key_down("KeyT");
        let _ = renderer.poll_actions(&mut scene, false);
        assert_eq!(
            scene.camera().unwrap().projection,
            crate::camera::Projection::Orthographic
        );
    }
}
