//! Geometry buffer: albedo, normal, specular and world position written by
//! one geometry pass, read by the lighting programs at texture units 0-3.

use super::framebuffer::{BoundFramebuffer, Framebuffer};
use crate::error::DeferredError;
use crate::gpu::binding::{BindingState, TextureGuard};
use crate::gpu::program::{ProgramInput, ShaderProgram};
use crate::gpu::shader_composer::{sources, ShaderComposer};

/// One colour channel of the G-buffer, in attachment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GBufferChannel {
    /// Surface colour.
    Albedo,
    /// World-space normal, signed; alpha holds window depth.
    Normal,
    /// Specular strength (r) and shininess / 256 (g).
    Specular,
    /// World-space position; alpha marks covered pixels.
    Position,
}

impl GBufferChannel {
    /// Every channel in attachment / texture-unit order.
    pub const ALL: [Self; 4] =
        [Self::Albedo, Self::Normal, Self::Specular, Self::Position];

    /// Attachment index, also the texture unit used for lighting.
    pub const fn index(self) -> usize {
        match self {
            Self::Albedo => 0,
            Self::Normal => 1,
            Self::Specular => 2,
            Self::Position => 3,
        }
    }

    /// Attachment format.
    pub const fn format(self) -> wgpu::TextureFormat {
        match self {
            Self::Albedo | Self::Specular => wgpu::TextureFormat::Rgba8Unorm,
            Self::Normal | Self::Position => wgpu::TextureFormat::Rgba16Float,
        }
    }
}

/// The geometry framebuffer.
#[derive(Debug)]
pub struct GBuffer {
    framebuffer: Framebuffer,
}

impl GBuffer {
    /// Attachment formats in order.
    pub const COLOR_FORMATS: [wgpu::TextureFormat; 4] = [
        GBufferChannel::Albedo.format(),
        GBufferChannel::Normal.format(),
        GBufferChannel::Specular.format(),
        GBufferChannel::Position.format(),
    ];

    /// Declare and allocate all attachments.
    ///
    /// # Errors
    ///
    /// Propagates [`Framebuffer::init`] errors.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<Self, DeferredError> {
        let mut framebuffer = Framebuffer::new("GBuffer");
        for format in Self::COLOR_FORMATS {
            let _ = framebuffer.add_color_target(format);
        }
        let _ = framebuffer.add_depth_target();
        framebuffer.set_clear_color(wgpu::Color::TRANSPARENT);
        framebuffer.init(device, width, height)?;
        Ok(Self { framebuffer })
    }

    /// The underlying framebuffer.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        self.framebuffer.size()
    }

    /// Clear every attachment (colour to transparent, depth to 1).
    ///
    /// # Errors
    ///
    /// See [`Framebuffer::clear`].
    pub fn clear(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        self.framebuffer.clear(encoder, bindings)
    }

    /// Make the G-buffer the current target for the geometry pass.
    ///
    /// # Errors
    ///
    /// See [`Framebuffer::bind`].
    pub fn bind<'a, 'b>(
        &'a self,
        bindings: &'b BindingState,
    ) -> Result<BoundFramebuffer<'a, 'b>, DeferredError> {
        self.framebuffer.bind(bindings)
    }

    /// Bind the four colour channels to texture units 0-3. Dropping the
    /// returned guards is `unbind_lighting`.
    ///
    /// # Errors
    ///
    /// See [`Framebuffer::bind_color_as_texture`].
    pub fn bind_lighting<'b>(
        &self,
        bindings: &'b BindingState,
    ) -> Result<Vec<TextureGuard<'b>>, DeferredError> {
        GBufferChannel::ALL
            .iter()
            .map(|channel| {
                let index = channel.index();
                self.framebuffer
                    .bind_color_as_texture(index, index as u32, bindings)
            })
            .collect()
    }

    /// Four-quadrant view of every channel into `view`.
    ///
    /// # Errors
    ///
    /// Binding or program errors.
    pub fn draw_buffers_to_screen(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        (view, format): (&wgpu::TextureView, wgpu::TextureFormat),
        debug: &DebugViews,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let _lighting = self.bind_lighting(bindings)?;
        Framebuffer::draw_fullscreen_quad(
            device,
            encoder,
            view,
            format,
            &debug.gbuffer,
            bindings,
        )
    }

    /// One channel full screen into `view`.
    ///
    /// # Errors
    ///
    /// Binding or program errors.
    pub fn draw_channel(
        &self,
        channel: GBufferChannel,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        (view, format): (&wgpu::TextureView, wgpu::TextureFormat),
        debug: &DebugViews,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let _texture =
            self.framebuffer
                .bind_color_as_texture(channel.index(), 0, bindings)?;
        let program = match channel {
            GBufferChannel::Normal => &debug.normal,
            _ => &debug.passthrough,
        };
        Framebuffer::draw_fullscreen_quad(
            device, encoder, view, format, program, bindings,
        )
    }

    /// Scene depth as greyscale into `view`.
    ///
    /// Reads the depth copy in the normal channel's alpha rather than the
    /// depth attachment, which not every backend can fetch from unfiltered.
    ///
    /// # Errors
    ///
    /// Binding or program errors.
    pub fn draw_depth(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        (view, format): (&wgpu::TextureView, wgpu::TextureFormat),
        debug: &DebugViews,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let _lighting = self.bind_lighting(bindings)?;
        Framebuffer::draw_fullscreen_quad(
            device,
            encoder,
            view,
            format,
            &debug.depth,
            bindings,
        )
    }
}

/// Programs used to present buffers directly.
pub struct DebugViews {
    /// Copies unit 0.
    pub passthrough: ShaderProgram,
    /// Four-quadrant G-buffer view over units 0-3.
    pub gbuffer: ShaderProgram,
    /// Signed normal at unit 0 remapped to colour.
    pub normal: ShaderProgram,
    /// Depth from the G-buffer at units 0-3 as greyscale.
    pub depth: ShaderProgram,
}

impl DebugViews {
    /// Compose all debug programs.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Shader`] on composition failure.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
    ) -> Result<Self, DeferredError> {
        let lighting_units: Vec<ProgramInput> =
            (0..4).map(ProgramInput::texture).collect();
        Ok(Self {
            passthrough: ShaderProgram::new(
                device,
                composer,
                "Passthrough",
                sources::PASSTHROUGH,
                &[ProgramInput::texture(0)],
            )?,
            gbuffer: ShaderProgram::new(
                device,
                composer,
                "GBuffer View",
                sources::DEBUG_GBUFFER,
                &lighting_units,
            )?,
            normal: ShaderProgram::new(
                device,
                composer,
                "Normal View",
                sources::DEBUG_NORMAL,
                &[ProgramInput::texture(0)],
            )?,
            depth: ShaderProgram::new(
                device,
                composer,
                "Depth View",
                sources::DEBUG_DEPTH,
                &lighting_units,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_map_to_consecutive_units() {
        let units: Vec<usize> =
            GBufferChannel::ALL.iter().map(|c| c.index()).collect();
        assert_eq!(units, vec![0, 1, 2, 3]);
    }

    #[test]
    fn signed_channels_use_float_targets() {
        assert_eq!(
            GBufferChannel::Normal.format(),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            GBufferChannel::Position.format(),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            GBuffer::COLOR_FORMATS[GBufferChannel::Albedo.index()],
            wgpu::TextureFormat::Rgba8Unorm
        );
    }
}
