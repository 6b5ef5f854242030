use std::fmt;

use super::debug;

/// Errors raised while opening the GPU.
#[derive(Debug)]
pub enum RenderContextError {
    /// The window handle could not back a wgpu surface.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No adapter matched the request.
    AdapterRequest(wgpu::RequestAdapterError),
    /// The adapter refused the device descriptor.
    DeviceRequest(wgpu::RequestDeviceError),
    /// The adapter cannot present to the surface.
    UnsupportedSurface,
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceCreation(e) => write!(f, "cannot create surface: {e}"),
            Self::AdapterRequest(e) => write!(f, "no usable GPU adapter: {e}"),
            Self::DeviceRequest(e) => write!(f, "cannot open GPU device: {e}"),
            Self::UnsupportedSurface => {
                write!(f, "adapter cannot present to this surface")
            }
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SurfaceCreation(e) => Some(e),
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
            Self::UnsupportedSurface => None,
        }
    }
}

/// Device, queue and (for windowed use) the presentation surface.
///
/// Offscreen contexts keep a surface configuration too, so width, height
/// and format read the same way in both modes.
pub struct RenderContext {
    /// Logical device.
    pub device: wgpu::Device,
    /// Submission queue.
    pub queue: wgpu::Queue,
    surface: Option<wgpu::Surface<'static>>,
    config: wgpu::SurfaceConfiguration,
}

async fn open_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
    power_preference: wgpu::PowerPreference,
    log_notifications: bool,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), RenderContextError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            compatible_surface: surface,
            power_preference,
            ..Default::default()
        })
        .await
        .map_err(RenderContextError::AdapterRequest)?;
    let info = adapter.get_info();
    log::info!("adapter: {} ({:?})", info.name, info.backend);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Deferred Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        })
        .await
        .map_err(RenderContextError::DeviceRequest)?;
    debug::install(&device, log_notifications);
    Ok((adapter, device, queue))
}

impl RenderContext {
    /// Open the GPU for a window and configure its surface at
    /// `initial_size` with vsync.
    ///
    /// Driver diagnostics are routed to the log; notification-level
    /// messages only when `log_notifications` is set.
    ///
    /// # Errors
    ///
    /// Surface creation, adapter or device request failures, or a surface
    /// the adapter cannot present to.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        initial_size: (u32, u32),
        log_notifications: bool,
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(RenderContextError::SurfaceCreation)?;
        let (adapter, device, queue) = open_device(
            &instance,
            Some(&surface),
            wgpu::PowerPreference::HighPerformance,
            log_notifications,
        )
        .await?;

        let (width, height) = (initial_size.0.max(1), initial_size.1.max(1));
        let mut config = surface
            .get_default_config(&adapter, width, height)
            .ok_or(RenderContextError::UnsupportedSurface)?;
        config.present_mode = wgpu::PresentMode::Fifo;
        surface.configure(&device, &config);

        Ok(Self {
            device,
            queue,
            surface: Some(surface),
            config,
        })
    }

    /// Open the GPU without a surface, for offscreen rendering and tests.
    /// The nominal target format is `Rgba8Unorm`.
    ///
    /// # Errors
    ///
    /// Adapter or device request failures.
    pub async fn headless(
        width: u32,
        height: u32,
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let (_, device, queue) = open_device(
            &instance,
            None,
            wgpu::PowerPreference::LowPower,
            false,
        )
        .await?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Rgba8Unorm,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        Ok(Self {
            device,
            queue,
            surface: None,
            config,
        })
    }

    /// Presentation format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Reconfigure the surface; zero-sized requests (minimized windows)
    /// are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    /// Next swapchain texture.
    ///
    /// # Errors
    ///
    /// [`wgpu::SurfaceError`] from the surface, or `Lost` for a headless
    /// context.
    pub fn get_next_frame(
        &self,
    ) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        match &self.surface {
            Some(surface) => surface.get_current_texture(),
            None => Err(wgpu::SurfaceError::Lost),
        }
    }

    /// Command encoder for one frame's passes.
    pub fn create_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            })
    }

    /// Finish `encoder` and submit it.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }
}
