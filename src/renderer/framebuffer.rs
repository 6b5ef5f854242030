//! Off-screen render targets with an ordered list of colour attachments and
//! an optional depth attachment.
//!
//! Binding follows a scoped model: [`Framebuffer::bind`] returns a
//! [`BoundFramebuffer`] through which render passes are opened, and
//! dropping it restores the previously bound target. Attachments exposed
//! for sampling are bound to texture units the same way.

use crate::error::DeferredError;
use crate::gpu::binding::{
    BindingState, BoundTexture, RenderTargetId, TargetGuard, TextureGuard,
};
use crate::gpu::pipeline_helpers::DEPTH_FORMAT;
use crate::gpu::program::ShaderProgram;
use crate::gpu::texture::RenderTarget;

/// Which attachments a render pass writes, and whether they are cleared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassTargets {
    /// First colour attachment only, existing contents kept.
    FirstColor,
    /// Every colour attachment plus depth, existing contents kept.
    All,
    /// Every colour attachment plus depth, cleared first.
    AllCleared,
}

/// Ordered colour attachments plus optional depth, all the same size.
#[derive(Debug)]
pub struct Framebuffer {
    label: String,
    id: RenderTargetId,
    color_formats: Vec<wgpu::TextureFormat>,
    has_depth: bool,
    color: Vec<RenderTarget>,
    depth: Option<RenderTarget>,
    size: (u32, u32),
    clear_color: wgpu::Color,
    initialized: bool,
}

impl Framebuffer {
    /// An empty framebuffer; declare attachments, then [`init`](Self::init).
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            id: RenderTargetId::next(),
            color_formats: Vec::new(),
            has_depth: false,
            color: Vec::new(),
            depth: None,
            size: (0, 0),
            clear_color: wgpu::Color::BLACK,
            initialized: false,
        }
    }

    /// Declare another colour attachment.
    pub fn add_color_target(&mut self, format: wgpu::TextureFormat) -> &mut Self {
        self.color_formats.push(format);
        self
    }

    /// Declare the depth attachment.
    pub fn add_depth_target(&mut self) -> &mut Self {
        self.has_depth = true;
        self
    }

    /// Colour written by [`clear`](Self::clear).
    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Allocate every declared attachment at `width` x `height`.
    ///
    /// Calling it again reallocates; this is the only way to resize.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::NoAttachments`] if nothing was declared.
    pub fn init(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), DeferredError> {
        if self.color_formats.is_empty() && !self.has_depth {
            return Err(DeferredError::NoAttachments);
        }
        let (width, height) = (width.max(1), height.max(1));
        self.color = self
            .color_formats
            .iter()
            .enumerate()
            .map(|(i, &format)| {
                RenderTarget::new(
                    device,
                    &format!("{} Color {i}", self.label),
                    width,
                    height,
                    format,
                )
            })
            .collect();
        self.depth = self.has_depth.then(|| {
            RenderTarget::new(
                device,
                &format!("{} Depth", self.label),
                width,
                height,
                DEPTH_FORMAT,
            )
        });
        self.size = (width, height);
        self.initialized = true;
        log::debug!("framebuffer '{}' allocated at {width}x{height}", self.label);
        Ok(())
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Binding-state identity.
    pub fn id(&self) -> RenderTargetId {
        self.id
    }

    /// Whether [`init`](Self::init) has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// `(width, height)` of every attachment.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Declared colour formats in attachment order.
    pub fn color_formats(&self) -> &[wgpu::TextureFormat] {
        &self.color_formats
    }

    /// Whether a depth attachment was declared.
    pub fn has_depth(&self) -> bool {
        self.has_depth
    }

    fn ensure_initialized(&self) -> Result<(), DeferredError> {
        if self.initialized {
            Ok(())
        } else {
            Err(DeferredError::Uninitialized(self.label.clone()))
        }
    }

    /// Colour attachment `index`.
    ///
    /// # Errors
    ///
    /// [`DeferredError::Uninitialized`] before `init`,
    /// [`DeferredError::MissingAttachment`] for an undeclared index.
    pub fn color(&self, index: usize) -> Result<&RenderTarget, DeferredError> {
        self.ensure_initialized()?;
        self.color
            .get(index)
            .ok_or_else(|| DeferredError::MissingAttachment {
                framebuffer: self.label.clone(),
                index,
            })
    }

    /// The depth attachment.
    ///
    /// # Errors
    ///
    /// [`DeferredError::Uninitialized`] before `init`,
    /// [`DeferredError::MissingDepth`] if none was declared.
    pub fn depth(&self) -> Result<&RenderTarget, DeferredError> {
        self.ensure_initialized()?;
        self.depth
            .as_ref()
            .ok_or_else(|| DeferredError::MissingDepth(self.label.clone()))
    }

    fn check_feedback(&self, bindings: &BindingState) -> Result<(), DeferredError> {
        match bindings.unit_sampling(self.id) {
            Some(unit) => Err(DeferredError::FeedbackLoop {
                framebuffer: self.label.clone(),
                unit,
            }),
            None => Ok(()),
        }
    }

    /// Make this framebuffer the current target until the returned value
    /// is dropped.
    ///
    /// # Errors
    ///
    /// [`DeferredError::Uninitialized`] before `init`, or
    /// [`DeferredError::FeedbackLoop`] if one of its attachments is bound
    /// to a texture unit.
    pub fn bind<'a, 'b>(
        &'a self,
        bindings: &'b BindingState,
    ) -> Result<BoundFramebuffer<'a, 'b>, DeferredError> {
        self.ensure_initialized()?;
        self.check_feedback(bindings)?;
        Ok(BoundFramebuffer {
            framebuffer: self,
            bindings,
            _guard: bindings.targets.bind(self.id),
        })
    }

    /// Expose colour attachment `index` at texture `unit`.
    ///
    /// # Errors
    ///
    /// See [`color`](Self::color).
    pub fn bind_color_as_texture<'b>(
        &self,
        index: usize,
        unit: u32,
        bindings: &'b BindingState,
    ) -> Result<TextureGuard<'b>, DeferredError> {
        let view = self.color(index)?.view.clone();
        Ok(bindings.textures.bind(
            unit,
            BoundTexture {
                view,
                owner: Some(self.id),
            },
        ))
    }

    /// Expose the depth attachment at texture `unit`.
    ///
    /// # Errors
    ///
    /// See [`depth`](Self::depth).
    pub fn bind_depth_as_texture<'b>(
        &self,
        unit: u32,
        bindings: &'b BindingState,
    ) -> Result<TextureGuard<'b>, DeferredError> {
        let view = self.depth()?.view.clone();
        Ok(bindings.textures.bind(
            unit,
            BoundTexture {
                view,
                owner: Some(self.id),
            },
        ))
    }

    /// Clear colour and depth.
    ///
    /// # Errors
    ///
    /// See [`bind`](Self::bind).
    pub fn clear(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let bound = self.bind(bindings)?;
        let _pass = bound.begin_pass(encoder, PassTargets::AllCleared)?;
        Ok(())
    }

    /// Draw a full-screen triangle with `program` into the first colour
    /// attachment, binding and unbinding this framebuffer around it.
    ///
    /// # Errors
    ///
    /// Binding errors, or unbound program inputs.
    pub fn render_to_fsq(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        program: &ShaderProgram,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let bound = self.bind(bindings)?;
        let format = self.color(0)?.format();
        let mut pass = bound.begin_pass(encoder, PassTargets::FirstColor)?;
        program.draw_fullscreen(device, &mut pass, format, bindings)
    }

    /// Copy colour attachment `index` into `destination`, which must match
    /// its size and format.
    ///
    /// # Errors
    ///
    /// See [`color`](Self::color).
    pub fn copy_color_to(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        index: usize,
        destination: &RenderTarget,
    ) -> Result<(), DeferredError> {
        let source = self.color(index)?;
        encoder.copy_texture_to_texture(
            source.texture.as_image_copy(),
            destination.texture.as_image_copy(),
            source.texture.size(),
        );
        Ok(())
    }

    /// Draw a full-screen triangle with `program` into the default target
    /// (`view`, typically the swapchain image).
    ///
    /// # Errors
    ///
    /// Returns unbound-input errors from `program`.
    pub fn draw_fullscreen_quad(
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        program: &ShaderProgram,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let _screen = bindings.targets.bind(RenderTargetId::SCREEN);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(program.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        program.draw_fullscreen(device, &mut pass, format, bindings)
    }
}

/// A framebuffer made current; dropping it unbinds.
pub struct BoundFramebuffer<'a, 'b> {
    framebuffer: &'a Framebuffer,
    bindings: &'b BindingState,
    _guard: TargetGuard<'b>,
}

impl BoundFramebuffer<'_, '_> {
    /// The bound framebuffer.
    pub fn framebuffer(&self) -> &Framebuffer {
        self.framebuffer
    }

    /// Open a render pass on the bound attachments.
    ///
    /// # Errors
    ///
    /// [`DeferredError::FeedbackLoop`] if an attachment was bound for
    /// sampling after this framebuffer was bound.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        targets: PassTargets,
    ) -> Result<wgpu::RenderPass<'e>, DeferredError> {
        let fb = self.framebuffer;
        fb.check_feedback(self.bindings)?;

        let clear = targets == PassTargets::AllCleared;
        let color_count = match targets {
            PassTargets::FirstColor => fb.color.len().min(1),
            PassTargets::All | PassTargets::AllCleared => fb.color.len(),
        };
        let color_load = if clear {
            wgpu::LoadOp::Clear(fb.clear_color)
        } else {
            wgpu::LoadOp::Load
        };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> =
            fb.color[..color_count]
                .iter()
                .map(|target| {
                    Some(wgpu::RenderPassColorAttachment {
                        view: &target.view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: color_load,
                            store: wgpu::StoreOp::Store,
                        },
                    })
                })
                .collect();

        let depth_stencil_attachment = match targets {
            PassTargets::FirstColor => None,
            PassTargets::All | PassTargets::AllCleared => {
                fb.depth.as_ref().map(|depth| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: if clear {
                                wgpu::LoadOp::Clear(1.0)
                            } else {
                                wgpu::LoadOp::Load
                            },
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                })
            }
        };

        Ok(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&fb.label),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_framebuffer_declares_nothing() {
        let fb = Framebuffer::new("empty");
        assert!(fb.color_formats().is_empty());
        assert!(!fb.has_depth());
        assert!(!fb.is_initialized());
    }

    #[test]
    fn attachments_are_declared_in_order() {
        let mut fb = Framebuffer::new("gbuffer");
        let _ = fb
            .add_color_target(wgpu::TextureFormat::Rgba8Unorm)
            .add_color_target(wgpu::TextureFormat::Rgba16Float)
            .add_depth_target();
        assert_eq!(
            fb.color_formats(),
            &[
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureFormat::Rgba16Float
            ]
        );
        assert!(fb.has_depth());
    }

    #[test]
    fn use_before_init_is_an_error() {
        let mut fb = Framebuffer::new("late");
        let _ = fb.add_color_target(wgpu::TextureFormat::Rgba8Unorm);
        let bindings = BindingState::default();
        assert!(matches!(fb.color(0), Err(DeferredError::Uninitialized(_))));
        assert!(matches!(
            fb.bind(&bindings),
            Err(DeferredError::Uninitialized(_))
        ));
        assert_eq!(bindings.targets.current(), RenderTargetId::SCREEN);
    }

    #[test]
    fn framebuffers_get_distinct_ids() {
        let a = Framebuffer::new("a");
        let b = Framebuffer::new("b");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn sampling_own_attachment_is_a_feedback_loop() {
        let Ok(context) =
            pollster::block_on(crate::gpu::render_context::RenderContext::headless(8, 8))
        else {
            return;
        };
        let mut fb = Framebuffer::new("loop");
        let _ = fb.add_color_target(wgpu::TextureFormat::Rgba8Unorm);
        fb.init(&context.device, 8, 8).unwrap();
        let bindings = BindingState::default();

        {
            let _bound = fb.bind(&bindings).unwrap();
            assert_eq!(bindings.targets.current(), fb.id());
        }
        assert_eq!(bindings.targets.current(), RenderTargetId::SCREEN);

        let texture = fb.bind_color_as_texture(0, 3, &bindings).unwrap();
        assert_eq!(bindings.unit_sampling(fb.id()), Some(3));
        assert!(matches!(
            fb.bind(&bindings),
            Err(DeferredError::FeedbackLoop { unit: 3, .. })
        ));
        drop(texture);
        assert!(fb.bind(&bindings).is_ok());
    }
}
