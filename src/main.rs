use std::path::{Path, PathBuf};
use std::sync::Arc;

use deferred_shading::engine::DeferredRenderer;
use deferred_shading::error::DeferredError;
use deferred_shading::gpu::render_context::RenderContext;
use deferred_shading::gpu::texture::Texture2D;
use deferred_shading::options::Options;
use deferred_shading::renderer::MeshBuilder;
use deferred_shading::scene::{
    FollowPath, GeometryShading, MaterialDesc, PingPong, Scene, SimpleMove,
};
use deferred_shading::util::easing::Easing;
use glam::{Vec2, Vec3, Vec4};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

const ASSET_DIR: &str = "assets";

struct ViewerApp {
    options: Options,
    asset_dir: PathBuf,
    window: Option<Arc<Window>>,
    renderer: Option<DeferredRenderer>,
    scene: Scene,
    fatal: Option<DeferredError>,
}

impl ViewerApp {
    fn new(options: Options, asset_dir: PathBuf) -> Self {
        Self {
            options,
            asset_dir,
            window: None,
            renderer: None,
            scene: Scene::new(),
            fatal: None,
        }
    }

    fn init(&mut self, window: &Arc<Window>) -> Result<(), DeferredError> {
        let size = window.inner_size();
        let context = pollster::block_on(RenderContext::new(
            window.clone(),
            (size.width, size.height),
            self.options.debug.log_notifications,
        ))?;
        let mut renderer =
            DeferredRenderer::new(context, self.options.clone(), &self.asset_dir)?;
        self.scene = build_demo_scene(&mut renderer, &self.asset_dir, &self.options)?;
        renderer.resize(&mut self.scene, size.width, size.height);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: DeferredError) {
        log::error!("{error}");
        self.fatal = Some(error);
        event_loop.exit();
    }
}

/// Optional texture under `assets/textures`; decode failures are fatal.
fn load_texture(
    renderer: &DeferredRenderer,
    asset_dir: &Path,
    name: &str,
) -> Result<Option<Arc<Texture2D>>, DeferredError> {
    let path = asset_dir.join("textures").join(name);
    if !path.exists() {
        log::debug!("{} not found, using a solid fallback", path.display());
        return Ok(None);
    }
    let texture =
        Texture2D::from_path(&renderer.context.device, &renderer.context.queue, &path)?;
    Ok(Some(Arc::new(texture)))
}

fn build_demo_scene(
    renderer: &mut DeferredRenderer,
    asset_dir: &Path,
    options: &Options,
) -> Result<Scene, DeferredError> {
    let mut scene = Scene::new();
    if let Some(mut camera) = scene.camera_mut() {
        camera.eye = Vec3::new(0.0, 6.0, 12.0);
        camera.target = Vec3::ZERO;
        camera.fovy = options.camera.fovy;
        camera.ortho_height = options.camera.ortho_height;
        camera.znear = options.camera.znear;
        camera.zfar = options.camera.zfar;
    }

    let device = &renderer.context.device;
    let ground_mesh = Arc::new(
        MeshBuilder::new()
            .add_plane(Vec3::ZERO, Vec2::splat(30.0), [1.0; 4])
            .bake(device, "Ground"),
    );
    let cube_mesh = Arc::new(
        MeshBuilder::new()
            .add_cube(Vec3::ZERO, Vec3::splat(0.5), [0.9, 0.3, 0.2, 1.0])
            .bake(device, "Cube"),
    );
    let sphere_mesh = Arc::new(
        MeshBuilder::new()
            .add_icosphere(Vec3::ZERO, 0.6, 3, [0.2, 0.5, 0.9, 1.0])
            .bake(device, "Sphere"),
    );
    let sky_mesh = Arc::new(
        MeshBuilder::new()
            .add_cube(Vec3::ZERO, Vec3::splat(40.0), [0.35, 0.45, 0.6, 1.0])
            .invert_faces()
            .bake(device, "Sky Box"),
    );

    let diffuse = load_texture(renderer, asset_dir, "diffuse.png")?;
    let detail = load_texture(renderer, asset_dir, "detail.png")?;
    let specular = load_texture(renderer, asset_dir, "specular.png")?;

    let material = |renderer: &mut DeferredRenderer,
                    shading: GeometryShading,
                    desc: MaterialDesc| {
        renderer
            .create_material(shading, desc)
            .ok_or_else(|| DeferredError::AssetLoad(format!("no shader for {shading:?}")))
    };
    let ground_material = material(
        renderer,
        GeometryShading::Textured,
        MaterialDesc {
            label: "Ground".to_owned(),
            texture_mix: 0.5,
            diffuse_a: diffuse,
            diffuse_b: detail,
            specular,
            ..MaterialDesc::default()
        },
    )?;
    let painted = material(
        renderer,
        GeometryShading::VertexColor,
        MaterialDesc {
            label: "Painted".to_owned(),
            shininess: 64.0,
            ..MaterialDesc::default()
        },
    )?;
    let sky_material = material(
        renderer,
        GeometryShading::VertexColor,
        MaterialDesc {
            label: "Sky".to_owned(),
            render_layer: 100,
            specular_strength: 0.0,
            tint: Vec4::ONE,
            ..MaterialDesc::default()
        },
    )?;

    let ground = scene.create_entity("ground");
    let _ = scene.insert(
        ground,
        renderer.create_renderer(ground_mesh, ground_material, false),
    );

    let player = scene.create_entity("player cube");
    if let Some(mut t) = scene.transform_mut(player) {
        t.position = Vec3::new(0.0, 0.5, 0.0);
    }
    let speed = options.camera.move_speed;
    let _ = scene.insert(
        player,
        (
            renderer.create_renderer(cube_mesh.clone(), painted.clone(), true),
            SimpleMove {
                speed,
                ..SimpleMove::default()
            },
        ),
    );

    let orbiter = scene.create_entity("orbiting sphere");
    let path = vec![
        Vec3::new(-4.0, 1.5, -4.0),
        Vec3::new(4.0, 2.5, -4.0),
        Vec3::new(4.0, 1.5, 4.0),
        Vec3::new(-4.0, 2.5, 4.0),
    ];
    let _ = scene.insert(
        orbiter,
        (
            renderer.create_renderer(sphere_mesh.clone(), painted.clone(), true),
            FollowPath::new(path).with_travel_time(2.0),
        ),
    );

    let bouncer = scene.create_entity("bouncing cube");
    let _ = scene.insert(
        bouncer,
        (
            renderer.create_renderer(cube_mesh.clone(), painted.clone(), true),
            PingPong::new(Vec3::new(-3.0, 0.5, 2.0), Vec3::new(3.0, 0.5, 2.0), 3.0)
                .with_easing(Easing::SmoothStep),
            SimpleMove {
                speed,
                ..SimpleMove::default()
            },
        ),
    );

    let sky = scene.create_entity("sky box");
    let _ = scene.insert(sky, renderer.create_renderer(sky_mesh, sky_material, false));

    let _ = scene.select_first();
    scene.update_transforms(0.0, Vec3::ZERO);
    if let Some(transform) = scene.transform(orbiter).cloned() {
        renderer.set_reference(Some(sphere_mesh), &transform);
    }
    Ok(scene)
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("Deferred Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, DeferredError::Viewer(e.to_string()));
                return;
            }
        };
        if let Err(e) = self.init(&window) {
            self.fail(event_loop, e);
            return;
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                renderer.resize(&mut self.scene, size.width, size.height);
            }

            WindowEvent::Focused(false) => renderer.release_keys(),

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    let key = format!("{code:?}");
                    if event.state == ElementState::Pressed {
                        renderer.key_down(&key);
                    } else {
                        renderer.key_up(&key);
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                let _ = renderer.poll_actions(&mut self.scene, false);
                match renderer.render(&mut self.scene) {
                    Ok(()) => {}
                    Err(DeferredError::Surface(
                        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost,
                    )) => {
                        if let Some(window) = &self.window {
                            let inner = window.inner_size();
                            renderer.resize(&mut self.scene, inner.width, inner.height);
                        }
                    }
                    Err(DeferredError::Surface(e)) => {
                        log::warn!("skipping frame: {e}");
                    }
                    Err(e) => {
                        self.fail(event_loop, e);
                        return;
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => (),
        }
    }
}

fn load_options(asset_dir: &Path) -> Options {
    let path = asset_dir.join("config.toml");
    match Options::load(&path) {
        Ok(options) => {
            log::info!("loaded options from {}", path.display());
            options
        }
        Err(e) => {
            log::warn!("{}: {e}; using defaults", path.display());
            Options::default()
        }
    }
}

fn main() {
    env_logger::init();

    let asset_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(ASSET_DIR), PathBuf::from);
    let options = load_options(&asset_dir);
    let presets = Options::list_presets(&asset_dir.join("presets"));
    if !presets.is_empty() {
        log::info!("available presets: {}", presets.join(", "));
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("failed to create event loop: {e}");
            std::process::exit(1);
        }
    };
    let mut app = ViewerApp::new(options, asset_dir);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {e}");
        std::process::exit(1);
    }
    if app.fatal.is_some() {
        std::process::exit(1);
    }
}
