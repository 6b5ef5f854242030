//! The active post effect: reads the lit composite, writes its own output.

use std::sync::Arc;

use rand::Rng;

use super::effect::EffectKind;
use super::lut::CubeLut;
use crate::error::DeferredError;
use crate::gpu::binding::{BindingState, BoundTexture};
use crate::gpu::program::{ProgramInput, ShaderProgram};
use crate::gpu::shader_composer::{sources, ShaderComposer};
use crate::gpu::texture::Texture3D;
use crate::gpu::uniform::UniformBlock;
use crate::renderer::framebuffer::Framebuffer;

/// Texture unit holding the effect input.
pub const SOURCE_UNIT: u32 = 0;
/// Texture unit holding the blurred bloom buffer during combine.
pub const BLOOM_UNIT: u32 = 1;
/// Texture unit holding the colour LUT.
pub const LUT_UNIT: u32 = 30;
/// Uniform slot holding [`EffectParams`].
pub const PARAMS_SLOT: u32 = 0;

const IDENTITY_LUT_SIZE: u32 = 16;

/// Shared effect uniform, mirrored by `deferred::effects::EffectParams`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EffectParams {
    /// x: primary strength, y: per-frame seed, zw: source texel size.
    pub values: [f32; 4],
    /// x: bloom threshold, yz: blur direction.
    pub extra: [f32; 4],
    /// LUT `DOMAIN_MIN` in rgb.
    pub lut_min: [f32; 4],
    /// LUT `DOMAIN_MAX` in rgb.
    pub lut_max: [f32; 4],
}

struct EffectPrograms {
    passthrough: ShaderProgram,
    sepia: ShaderProgram,
    greyscale: ShaderProgram,
    color_correct: ShaderProgram,
    film_grain: ShaderProgram,
    pixelate: ShaderProgram,
    bloom_threshold: ShaderProgram,
    bloom_blur: ShaderProgram,
    bloom_combine: ShaderProgram,
}

impl EffectPrograms {
    fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
    ) -> Result<Self, DeferredError> {
        let single = [
            ProgramInput::texture(SOURCE_UNIT),
            ProgramInput::uniform(PARAMS_SLOT),
        ];
        let mut program = |label: &str, source| {
            ShaderProgram::new(device, composer, label, source, &single)
        };
        let passthrough = program("Passthrough Effect", sources::PASSTHROUGH)?;
        let sepia = program("Sepia", sources::SEPIA)?;
        let greyscale = program("Greyscale", sources::GREYSCALE)?;
        let film_grain = program("Film Grain", sources::FILM_GRAIN)?;
        let pixelate = program("Pixelate", sources::PIXELATE)?;
        let bloom_threshold = program("Bloom Threshold", sources::BLOOM_THRESHOLD)?;
        let bloom_blur = program("Bloom Blur", sources::BLOOM_BLUR)?;
        Ok(Self {
            passthrough,
            sepia,
            greyscale,
            film_grain,
            pixelate,
            bloom_threshold,
            bloom_blur,
            color_correct: ShaderProgram::new(
                device,
                composer,
                "Color Correct",
                sources::COLOR_CORRECT,
                &[
                    ProgramInput::texture(SOURCE_UNIT),
                    ProgramInput::volume(LUT_UNIT),
                    ProgramInput::uniform(PARAMS_SLOT),
                ],
            )?,
            bloom_combine: ShaderProgram::new(
                device,
                composer,
                "Bloom Combine",
                sources::BLOOM_COMBINE,
                &[
                    ProgramInput::texture(SOURCE_UNIT),
                    ProgramInput::texture(BLOOM_UNIT),
                    ProgramInput::uniform(PARAMS_SLOT),
                ],
            )?,
        })
    }
}

/// A configurable full-screen effect with its own output framebuffer.
pub struct PostEffect {
    kind: EffectKind,
    output: Framebuffer,
    bloom: [Framebuffer; 2],
    programs: EffectPrograms,
    params: UniformBlock<EffectParams>,
    blur: [UniformBlock<EffectParams>; 2],
    lut: Texture3D,
    lut_domain: ([f32; 3], [f32; 3]),
}

impl PostEffect {
    /// Allocate the output and bloom buffers and compose every program.
    ///
    /// # Errors
    ///
    /// Shader composition or framebuffer errors.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        composer: &mut ShaderComposer,
        (width, height): (u32, u32),
        kind: EffectKind,
    ) -> Result<Self, DeferredError> {
        let mut output = Framebuffer::new("Post Effect");
        let _ = output.add_color_target(wgpu::TextureFormat::Rgba8Unorm);
        output.init(device, width, height)?;

        let mut bloom = [Framebuffer::new("Bloom Ping"), Framebuffer::new("Bloom Pong")];
        for fb in &mut bloom {
            let _ = fb.add_color_target(wgpu::TextureFormat::Rgba16Float);
            fb.init(device, width, height)?;
        }

        let block = |label: &str| UniformBlock::new(device, label, EffectParams::default());
        let mut effect = Self {
            kind: EffectKind::Passthrough,
            output,
            bloom,
            programs: EffectPrograms::new(device, composer)?,
            params: block("Effect Params"),
            blur: [block("Blur Horizontal"), block("Blur Vertical")],
            lut: Texture3D::identity(device, queue, IDENTITY_LUT_SIZE),
            lut_domain: ([0.0; 3], [1.0; 3]),
        };
        effect.set_kind(device, queue, kind);
        Ok(effect)
    }

    /// Active effect.
    pub fn kind(&self) -> &EffectKind {
        &self.kind
    }

    /// Switch effects, uploading a new LUT if the kind carries one.
    pub fn set_kind(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, kind: EffectKind) {
        if let EffectKind::ColorCorrect { lut, .. } = &kind {
            let table = lut
                .clone()
                .unwrap_or_else(|| Arc::new(CubeLut::identity(IDENTITY_LUT_SIZE)));
            self.lut = table.upload(device, queue);
            self.lut_domain = table.domain();
        }
        log::info!("post effect: {}", kind.name());
        self.kind = kind;
    }

    /// Forward to [`EffectKind::set_param`].
    pub fn set_param(&mut self, name: &str, value: f32) -> bool {
        self.kind.set_param(name, value)
    }

    /// Framebuffer holding the final image.
    pub fn output(&self) -> &Framebuffer {
        &self.output
    }

    /// Clear the output and bloom buffers.
    ///
    /// # Errors
    ///
    /// See [`Framebuffer::clear`].
    pub fn clear(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        self.output.clear(encoder, bindings)?;
        for fb in &self.bloom {
            fb.clear(encoder, bindings)?;
        }
        Ok(())
    }

    fn upload_params(&mut self, queue: &wgpu::Queue, source: &Framebuffer) {
        let (w, h) = source.size();
        let texel = [1.0 / w.max(1) as f32, 1.0 / h.max(1) as f32];
        let seed = if matches!(self.kind, EffectKind::FilmGrain { .. }) {
            rand::rng().random::<f32>()
        } else {
            0.0
        };
        let threshold = match self.kind {
            EffectKind::Bloom { threshold, .. } => threshold,
            _ => 0.0,
        };
        let values = [self.kind.primary(), seed, texel[0], texel[1]];
        let (min, max) = self.lut_domain;
        let base = EffectParams {
            values,
            extra: [threshold, 0.0, 0.0, 0.0],
            lut_min: [min[0], min[1], min[2], 0.0],
            lut_max: [max[0], max[1], max[2], 1.0],
        };
        self.params.write(queue, base);
        for (block, dir) in self.blur.iter_mut().zip([[1.0, 0.0], [0.0, 1.0]]) {
            block.write(
                queue,
                EffectParams {
                    extra: [threshold, dir[0], dir[1], 0.0],
                    ..base
                },
            );
        }
    }

    /// Run the active effect over colour attachment 0 of `source` into
    /// [`output`](Self::output).
    ///
    /// # Errors
    ///
    /// Binding or program errors.
    pub fn apply(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        source: &Framebuffer,
        bindings: &BindingState,
    ) -> Result<(), DeferredError> {
        self.upload_params(queue, source);
        let _source = source.bind_color_as_texture(0, SOURCE_UNIT, bindings)?;
        let _params = self.params.bind(bindings, PARAMS_SLOT);

        let programs = &self.programs;
        let simple = match &self.kind {
            EffectKind::Passthrough => Some(&programs.passthrough),
            EffectKind::Sepia { .. } => Some(&programs.sepia),
            EffectKind::Greyscale { .. } => Some(&programs.greyscale),
            EffectKind::FilmGrain { .. } => Some(&programs.film_grain),
            EffectKind::Pixelate { .. } => Some(&programs.pixelate),
            EffectKind::ColorCorrect { .. } | EffectKind::Bloom { .. } => None,
        };
        if let Some(program) = simple {
            return self.output.render_to_fsq(device, encoder, program, bindings);
        }

        match self.kind {
            EffectKind::ColorCorrect { .. } => {
                let _lut = bindings.textures.bind(
                    LUT_UNIT,
                    BoundTexture {
                        view: self.lut.view.clone(),
                        owner: None,
                    },
                );
                self.output
                    .render_to_fsq(device, encoder, &programs.color_correct, bindings)
            }
            EffectKind::Bloom { passes, .. } => {
                let [ping, pong] = &self.bloom;
                ping.render_to_fsq(device, encoder, &programs.bloom_threshold, bindings)?;
                for _ in 0..passes {
                    {
                        let _input = ping.bind_color_as_texture(0, SOURCE_UNIT, bindings)?;
                        let _dir = self.blur[0].bind(bindings, PARAMS_SLOT);
                        pong.render_to_fsq(device, encoder, &programs.bloom_blur, bindings)?;
                    }
                    let _input = pong.bind_color_as_texture(0, SOURCE_UNIT, bindings)?;
                    let _dir = self.blur[1].bind(bindings, PARAMS_SLOT);
                    ping.render_to_fsq(device, encoder, &programs.bloom_blur, bindings)?;
                }
                let _glow = ping.bind_color_as_texture(0, BLOOM_UNIT, bindings)?;
                self.output
                    .render_to_fsq(device, encoder, &programs.bloom_combine, bindings)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::render_context::RenderContext;

    #[test]
    fn lut_domain_reaches_the_effect_uniform() {
        let Some(ctx) = pollster::block_on(RenderContext::headless(8, 8)).ok() else {
            return;
        };
        let mut composer = ShaderComposer::new().unwrap();
        let text = "LUT_3D_SIZE 2\nDOMAIN_MIN 0 0 0\nDOMAIN_MAX 2 4 8\n".to_owned()
            + &"0.5 0.5 0.5\n".repeat(8);
        let lut = Arc::new(CubeLut::parse(&text).unwrap());
        let kind = EffectKind::ColorCorrect {
            strength: 1.0,
            lut: Some(lut),
        };
        let mut effect =
            PostEffect::new(&ctx.device, &ctx.queue, &mut composer, (8, 8), kind).unwrap();

        let mut source = Framebuffer::new("Source");
        let _ = source.add_color_target(wgpu::TextureFormat::Rgba8Unorm);
        source.init(&ctx.device, 8, 8).unwrap();
        effect.upload_params(&ctx.queue, &source);
        let params = *effect.params.get();
        assert_eq!(params.lut_min, [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(params.lut_max, [2.0, 4.0, 8.0, 1.0]);
        assert_eq!(params.values[0], 1.0);

        // Switching back to an identity table restores the unit domain.
        effect.set_kind(
            &ctx.device,
            &ctx.queue,
            EffectKind::ColorCorrect {
                strength: 1.0,
                lut: None,
            },
        );
        effect.upload_params(&ctx.queue, &source);
        assert_eq!(effect.params.get().lut_max, [1.0, 1.0, 1.0, 1.0]);
    }
}
