//! Full-screen shader programs driven by the binding state.
//!
//! A program declares which texture units and uniform slots it reads. Its
//! bind group layout is derived from that list: binding 0 is a linear
//! sampler, then each declared input in order from binding 1. The WGSL
//! source must declare the same bindings. At draw time the bind group is
//! assembled from whatever is currently bound in [`BindingState`].
//!
//! Depth textures are only read through a comparison sampler
//! ([`ProgramInput::ShadowSampler`]); the GL backend has no plain depth
//! fetch.

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use super::binding::BindingState;
use super::pipeline_helpers;
use super::shader_composer::ShaderComposer;
use crate::error::DeferredError;

/// How a texture input is declared in WGSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// `texture_2d<f32>`.
    Float,
    /// `texture_depth_2d`.
    Depth,
    /// `texture_3d<f32>`.
    Float3d,
}

/// One input of a program, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramInput {
    /// Texture bound at a texture unit.
    Texture {
        /// Texture unit.
        unit: u32,
        /// WGSL declaration kind.
        kind: TextureKind,
    },
    /// Uniform block bound at a slot.
    Uniform {
        /// Uniform slot.
        slot: u32,
    },
    /// `sampler_comparison` owned by the program (`LessEqual`, nearest).
    ShadowSampler,
}

impl ProgramInput {
    /// Float texture at `unit`.
    pub const fn texture(unit: u32) -> Self {
        Self::Texture {
            unit,
            kind: TextureKind::Float,
        }
    }

    /// Depth texture at `unit`.
    pub const fn depth(unit: u32) -> Self {
        Self::Texture {
            unit,
            kind: TextureKind::Depth,
        }
    }

    /// 3D texture at `unit`.
    pub const fn volume(unit: u32) -> Self {
        Self::Texture {
            unit,
            kind: TextureKind::Float3d,
        }
    }

    /// Uniform block at `slot`.
    pub const fn uniform(slot: u32) -> Self {
        Self::Uniform { slot }
    }

    /// Comparison sampler for the depth inputs.
    pub const fn shadow_sampler() -> Self {
        Self::ShadowSampler
    }

    fn layout_entry(self, binding: u32) -> wgpu::BindGroupLayoutEntry {
        match self {
            Self::Texture {
                kind: TextureKind::Float,
                ..
            } => pipeline_helpers::texture_2d(binding),
            Self::Texture {
                kind: TextureKind::Depth,
                ..
            } => pipeline_helpers::depth_texture_2d(binding),
            Self::Texture {
                kind: TextureKind::Float3d,
                ..
            } => pipeline_helpers::texture_3d(binding),
            Self::Uniform { .. } => pipeline_helpers::uniform_buffer(binding),
            Self::ShadowSampler => pipeline_helpers::comparison_sampler(binding),
        }
    }
}

/// A composed full-screen program with a per-format pipeline cache.
pub struct ShaderProgram {
    label: String,
    module: wgpu::ShaderModule,
    inputs: Vec<ProgramInput>,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    compare_sampler: Option<wgpu::Sampler>,
    blend: Option<wgpu::BlendState>,
    pipelines: RefCell<FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>>,
}

impl ShaderProgram {
    /// Compose `source` and build its bind group layout from `inputs`.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Shader`] if composition fails.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        label: &str,
        (source, file_path): (&str, &str),
        inputs: &[ProgramInput],
    ) -> Result<Self, DeferredError> {
        let module = composer.compose(device, label, source, file_path)?;

        let mut entries = vec![pipeline_helpers::filtering_sampler(0)];
        entries.extend(
            inputs
                .iter()
                .zip(1u32..)
                .map(|(input, binding)| input.layout_entry(binding)),
        );
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} Layout")),
                entries: &entries,
            });

        Ok(Self {
            label: label.to_owned(),
            module,
            inputs: inputs.to_vec(),
            layout,
            sampler: pipeline_helpers::linear_sampler(
                device,
                &format!("{label} Sampler"),
            ),
            compare_sampler: inputs
                .contains(&ProgramInput::ShadowSampler)
                .then(|| {
                    pipeline_helpers::shadow_compare_sampler(
                        device,
                        &format!("{label} Shadow Sampler"),
                    )
                }),
            blend: None,
            pipelines: RefCell::new(FxHashMap::default()),
        })
    }

    /// Use `blend` for every pipeline built from now on.
    #[must_use]
    pub fn with_blend(mut self, blend: wgpu::BlendState) -> Self {
        self.blend = Some(blend);
        self.pipelines.borrow_mut().clear();
        self
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Declared inputs, in binding order.
    pub fn inputs(&self) -> &[ProgramInput] {
        &self.inputs
    }

    /// Pipeline rendering into `format`, built on first use.
    pub fn pipeline(
        &self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        self.pipelines
            .borrow_mut()
            .entry(format)
            .or_insert_with(|| {
                pipeline_helpers::create_screen_space_pipeline(
                    device,
                    &self.label,
                    &self.module,
                    format,
                    self.blend,
                    &[&self.layout],
                )
            })
            .clone()
    }

    /// Assemble a bind group from the currently bound units and slots.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::UnboundTexture`] or
    /// [`DeferredError::UnboundUniform`] for the first declared input with
    /// nothing bound.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        bindings: &BindingState,
    ) -> Result<wgpu::BindGroup, DeferredError> {
        enum Resolved<'a> {
            View(wgpu::TextureView),
            Buffer(wgpu::Buffer),
            Sampler(&'a wgpu::Sampler),
        }

        let resolved = self
            .inputs
            .iter()
            .map(|input| match *input {
                ProgramInput::Texture { unit, .. } => bindings
                    .textures
                    .get(unit)
                    .map(|bound| Resolved::View(bound.view))
                    .ok_or(DeferredError::UnboundTexture(unit)),
                ProgramInput::Uniform { slot } => bindings
                    .uniforms
                    .get(slot)
                    .map(Resolved::Buffer)
                    .ok_or(DeferredError::UnboundUniform(slot)),
                ProgramInput::ShadowSampler => Ok(Resolved::Sampler(
                    self.compare_sampler.as_ref().unwrap_or(&self.sampler),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        }];
        entries.extend(resolved.iter().zip(1u32..).map(|(res, binding)| {
            wgpu::BindGroupEntry {
                binding,
                resource: match res {
                    Resolved::View(view) => {
                        wgpu::BindingResource::TextureView(view)
                    }
                    Resolved::Buffer(buffer) => buffer.as_entire_binding(),
                    Resolved::Sampler(sampler) => {
                        wgpu::BindingResource::Sampler(*sampler)
                    }
                },
            }
        }));

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", self.label)),
            layout: &self.layout,
            entries: &entries,
        }))
    }

    /// Record a full-screen triangle into an open render pass.
    ///
    /// # Errors
    ///
    /// Propagates [`bind_group`](Self::bind_group) errors.
    pub fn draw_fullscreen(
        &self,
        device: &wgpu::Device,
        pass: &mut wgpu::RenderPass<'_>,
        format: wgpu::TextureFormat,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        let bind_group = self.bind_group(device, bindings)?;
        pass.set_pipeline(&self.pipeline(device, format));
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}
