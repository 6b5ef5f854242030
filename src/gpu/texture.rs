//! Render targets and sampled textures.

use std::path::Path;

use crate::error::DeferredError;

/// A render-target texture and its default view.
///
/// The texture is created with `RENDER_ATTACHMENT | TEXTURE_BINDING |
/// COPY_SRC | COPY_DST` usage flags, making it suitable for off-screen
/// rendering followed by sampling, read-back or copying.
#[derive(Debug)]
pub struct RenderTarget {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    /// Create a new render-target texture with the given dimensions and
    /// format.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Texture format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }
}

/// A sampled RGBA8 texture uploaded from CPU data.
#[derive(Debug, Clone)]
pub struct Texture2D {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl Texture2D {
    /// Upload tightly packed sRGB-agnostic RGBA8 pixels.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// A 1x1 texture of a single colour.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        rgba: [u8; 4],
    ) -> Self {
        Self::from_rgba8(device, queue, label, 1, 1, &rgba)
    }

    /// Decode an encoded PNG/JPEG image and upload it.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::AssetLoad`] if the bytes cannot be decoded.
    pub fn from_image_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        bytes: &[u8],
    ) -> Result<Self, DeferredError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| DeferredError::AssetLoad(format!("{label}: {e}")))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self::from_rgba8(
            device,
            queue,
            label,
            width,
            height,
            image.as_raw(),
        ))
    }

    /// Load and upload an image file.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Io`] if the file cannot be read, or
    /// [`DeferredError::AssetLoad`] if it cannot be decoded.
    pub fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
    ) -> Result<Self, DeferredError> {
        let bytes = std::fs::read(path)?;
        let label = path.display().to_string();
        log::info!("loading texture {label}");
        Self::from_image_bytes(device, queue, &label, &bytes)
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }
}

/// A cubic RGBA8 3D texture (colour lookup tables).
#[derive(Debug, Clone)]
pub struct Texture3D {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl Texture3D {
    /// Upload `size³` RGB entries in red-fastest order, each channel in
    /// `0.0..=1.0`.
    pub fn from_rgb(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        size: u32,
        rgb: &[[f32; 3]],
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: size,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let texels: Vec<u8> = rgb
            .iter()
            .flat_map(|c| {
                let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                [q(c[0]), q(c[1]), q(c[2]), 255]
            })
            .collect();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size),
                rows_per_image: Some(size),
            },
            extent,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Identity LUT of the given edge length.
    pub fn identity(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u32,
    ) -> Self {
        let max = (size.max(2) - 1) as f32;
        let mut rgb = Vec::with_capacity((size * size * size) as usize);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    rgb.push([r as f32 / max, g as f32 / max, b as f32 / max]);
                }
            }
        }
        Self::from_rgb(device, queue, "Identity LUT", size, &rgb)
    }
}
