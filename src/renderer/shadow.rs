//! Depth-only framebuffer rendered from the sun's point of view.

use super::framebuffer::{BoundFramebuffer, Framebuffer};
use crate::error::DeferredError;
use crate::gpu::binding::{BindingState, TextureGuard};

/// Texture unit the lighting pass samples the shadow map from.
pub const SHADOW_UNIT: u32 = 30;

/// Square depth-only shadow map.
#[derive(Debug)]
pub struct ShadowMap {
    framebuffer: Framebuffer,
}

impl ShadowMap {
    /// Allocate a `resolution` x `resolution` depth target.
    ///
    /// # Errors
    ///
    /// Propagates [`Framebuffer::init`] errors.
    pub fn new(device: &wgpu::Device, resolution: u32) -> Result<Self, DeferredError> {
        let mut framebuffer = Framebuffer::new("Shadow Map");
        let _ = framebuffer.add_depth_target();
        framebuffer.init(device, resolution, resolution)?;
        Ok(Self { framebuffer })
    }

    /// The underlying framebuffer.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Edge length in texels.
    pub fn resolution(&self) -> u32 {
        self.framebuffer.size().0
    }

    /// Reset depth to 1.
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

    /// Make the shadow map the current target.
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

    /// Expose the depth at [`SHADOW_UNIT`] for the lighting pass.
    ///
    /// # Errors
    ///
    /// See [`Framebuffer::bind_depth_as_texture`].
    pub fn bind_for_lighting<'b>(
        &self,
        bindings: &'b BindingState,
    ) -> Result<TextureGuard<'b>, DeferredError> {
        self.framebuffer.bind_depth_as_texture(SHADOW_UNIT, bindings)
    }
}
