//! Crate-level error types.

use std::fmt;

use crate::engine::FramePass;
use crate::gpu::render_context::RenderContextError;

/// Errors produced by the deferred-shading crate.
#[derive(Debug)]
pub enum DeferredError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// WGSL composition or module creation failure.
    Shader(String),
    /// `Framebuffer::init` called before any attachment was declared.
    NoAttachments,
    /// An attachment index outside the framebuffer's attachment list.
    MissingAttachment {
        /// Framebuffer label.
        framebuffer: String,
        /// Requested colour attachment index.
        index: usize,
    },
    /// Depth attachment requested from a framebuffer declared without one.
    MissingDepth(String),
    /// Framebuffer used before `init`.
    Uninitialized(String),
    /// A shader program reads a texture unit that nothing is bound to.
    UnboundTexture(u32),
    /// A shader program reads a uniform slot that nothing is bound to.
    UnboundUniform(u32),
    /// A framebuffer was drawn into while one of its own attachments was
    /// bound for sampling.
    FeedbackLoop {
        /// Framebuffer label.
        framebuffer: String,
        /// Texture unit still holding one of its attachments.
        unit: u32,
    },
    /// A frame pass ran before the pass it depends on.
    PassOrder {
        /// The pass that was attempted.
        attempted: FramePass,
        /// The pass that must have run first in this frame.
        requires: FramePass,
    },
    /// Texture or mesh asset could not be decoded.
    AssetLoad(String),
    /// Malformed `.cube` colour lookup table.
    Lut(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// GPU buffer readback failure.
    Readback(String),
    /// Swapchain texture could not be acquired.
    Surface(wgpu::SurfaceError),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for DeferredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::NoAttachments => {
                write!(f, "framebuffer has no attachments to initialize")
            }
            Self::MissingAttachment { framebuffer, index } => write!(
                f,
                "framebuffer '{framebuffer}' has no colour attachment {index}"
            ),
            Self::MissingDepth(label) => {
                write!(f, "framebuffer '{label}' has no depth attachment")
            }
            Self::Uninitialized(label) => {
                write!(f, "framebuffer '{label}' used before init")
            }
            Self::UnboundTexture(unit) => {
                write!(f, "no texture bound to unit {unit}")
            }
            Self::UnboundUniform(slot) => {
                write!(f, "no uniform block bound to slot {slot}")
            }
            Self::FeedbackLoop { framebuffer, unit } => write!(
                f,
                "framebuffer '{framebuffer}' is sampled at unit {unit} while \
                 being rendered to"
            ),
            Self::PassOrder {
                attempted,
                requires,
            } => write!(
                f,
                "{attempted:?} pass requires {requires:?} earlier in the frame"
            ),
            Self::AssetLoad(msg) => write!(f, "asset load error: {msg}"),
            Self::Lut(msg) => write!(f, "LUT parse error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Readback(msg) => write!(f, "readback error: {msg}"),
            Self::Surface(e) => write!(f, "surface error: {e}"),
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for DeferredError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for DeferredError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for DeferredError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<wgpu::SurfaceError> for DeferredError {
    fn from(e: wgpu::SurfaceError) -> Self {
        Self::Surface(e)
    }
}
