use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

use crate::error::DeferredError;

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Consuming
/// shaders use `#import deferred::module_name` to pull in shared code. The
/// composer produces `naga::Module` IR directly, skipping WGSL re-parse at
/// runtime.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/lights.wgsl"),
        file_path: "modules/lights.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/mesh.wgsl"),
        file_path: "modules/mesh.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/gbuffer.wgsl"),
        file_path: "modules/gbuffer.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/effects.wgsl"),
        file_path: "modules/effects.wgsl",
    },
];

impl ShaderComposer {
    /// Create a composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, DeferredError> {
        let mut composer = Composer::default();
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    DeferredError::Shader(format!(
                        "failed to register shader module '{}': {e:?}",
                        m.file_path
                    ))
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose a shader source string (which may contain `#import`
    /// directives) into a `wgpu::ShaderModule` ready for pipeline creation.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Shader`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
        file_path: &str,
    ) -> Result<wgpu::ShaderModule, DeferredError> {
        let naga_module = self.compose_naga(source, file_path)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a
    /// wgpu shader module. Useful for testing shader composition without a
    /// GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Shader`] if composition fails.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, DeferredError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| {
                DeferredError::Shader(format!(
                    "failed to compose '{file_path}': {}",
                    e.emit_to_string(&self.composer)
                ))
            })
    }
}

/// Embedded WGSL sources, keyed by the file path used in diagnostics.
pub mod sources {
    /// Lighting: directional sun + point light into the illumination buffer.
    pub const DIRECTIONAL: (&str, &str) = (
        include_str!("../../assets/shaders/lighting/directional.wgsl"),
        "lighting/directional.wgsl",
    );
    /// Lighting: ambient term composited over the illumination buffer.
    pub const AMBIENT: (&str, &str) = (
        include_str!("../../assets/shaders/lighting/ambient.wgsl"),
        "lighting/ambient.wgsl",
    );
    /// Lighting: Reinhard tone mapping of the illumination buffer.
    pub const HDR: (&str, &str) = (
        include_str!("../../assets/shaders/lighting/hdr.wgsl"),
        "lighting/hdr.wgsl",
    );
    /// Geometry: G-buffer fill.
    pub const GBUFFER_PASS: (&str, &str) = (
        include_str!("../../assets/shaders/geometry/gbuffer_pass.wgsl"),
        "geometry/gbuffer_pass.wgsl",
    );
    /// Geometry: depth-only shadow map fill.
    pub const SHADOW_DEPTH: (&str, &str) = (
        include_str!("../../assets/shaders/geometry/shadow_depth.wgsl"),
        "geometry/shadow_depth.wgsl",
    );
    /// Geometry: forward-lit reference mesh for the illumination view.
    pub const REFERENCE: (&str, &str) = (
        include_str!("../../assets/shaders/geometry/reference.wgsl"),
        "geometry/reference.wgsl",
    );
    /// Screen: copy unit 0 to the target.
    pub const PASSTHROUGH: (&str, &str) = (
        include_str!("../../assets/shaders/screen/passthrough.wgsl"),
        "screen/passthrough.wgsl",
    );
    /// Screen: four-quadrant G-buffer view.
    pub const DEBUG_GBUFFER: (&str, &str) = (
        include_str!("../../assets/shaders/screen/debug_gbuffer.wgsl"),
        "screen/debug_gbuffer.wgsl",
    );
    /// Screen: signed normal remapped into colour range.
    pub const DEBUG_NORMAL: (&str, &str) = (
        include_str!("../../assets/shaders/screen/debug_normal.wgsl"),
        "screen/debug_normal.wgsl",
    );
    /// Screen: depth attachment as greyscale.
    pub const DEBUG_DEPTH: (&str, &str) = (
        include_str!("../../assets/shaders/screen/debug_depth.wgsl"),
        "screen/debug_depth.wgsl",
    );
    /// Effect: sepia toning.
    pub const SEPIA: (&str, &str) = (
        include_str!("../../assets/shaders/screen/sepia.wgsl"),
        "screen/sepia.wgsl",
    );
    /// Effect: luminance greyscale.
    pub const GREYSCALE: (&str, &str) = (
        include_str!("../../assets/shaders/screen/greyscale.wgsl"),
        "screen/greyscale.wgsl",
    );
    /// Effect: 3D LUT colour correction.
    pub const COLOR_CORRECT: (&str, &str) = (
        include_str!("../../assets/shaders/screen/color_correct.wgsl"),
        "screen/color_correct.wgsl",
    );
    /// Effect: animated film grain.
    pub const FILM_GRAIN: (&str, &str) = (
        include_str!("../../assets/shaders/screen/film_grain.wgsl"),
        "screen/film_grain.wgsl",
    );
    /// Effect: pixelation.
    pub const PIXELATE: (&str, &str) = (
        include_str!("../../assets/shaders/screen/pixelate.wgsl"),
        "screen/pixelate.wgsl",
    );
    /// Effect: bloom bright-pass.
    pub const BLOOM_THRESHOLD: (&str, &str) = (
        include_str!("../../assets/shaders/screen/bloom_threshold.wgsl"),
        "screen/bloom_threshold.wgsl",
    );
    /// Effect: separable Gaussian blur.
    pub const BLOOM_BLUR: (&str, &str) = (
        include_str!("../../assets/shaders/screen/bloom_blur.wgsl"),
        "screen/bloom_blur.wgsl",
    );
    /// Effect: additive bloom combine.
    pub const BLOOM_COMBINE: (&str, &str) = (
        include_str!("../../assets/shaders/screen/bloom_combine.wgsl"),
        "screen/bloom_combine.wgsl",
    );

    /// Every composable shader in the crate.
    pub const ALL: &[(&str, &str)] = &[
        DIRECTIONAL,
        AMBIENT,
        HDR,
        GBUFFER_PASS,
        SHADOW_DEPTH,
        REFERENCE,
        PASSTHROUGH,
        DEBUG_GBUFFER,
        DEBUG_NORMAL,
        DEBUG_DEPTH,
        SEPIA,
        GREYSCALE,
        COLOR_CORRECT,
        FILM_GRAIN,
        PIXELATE,
        BLOOM_THRESHOLD,
        BLOOM_BLUR,
        BLOOM_COMBINE,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_shaders_compose_and_validate() {
        let mut composer = ShaderComposer::new().unwrap();
        for &(source, file_path) in sources::ALL {
            let module = composer
                .compose_naga(source, file_path)
                .unwrap_or_else(|e| panic!("{file_path}: {e}"));
            let _ = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::all(),
            )
            .validate(&module)
            .unwrap_or_else(|e| panic!("{file_path} failed validation: {e:?}"));
        }
    }

    #[test]
    fn screen_shaders_export_both_entry_points() {
        let mut composer = ShaderComposer::new().unwrap();
        for &(source, file_path) in sources::ALL {
            if !file_path.starts_with("screen/")
                && !file_path.starts_with("lighting/")
            {
                continue;
            }
            let module = composer.compose_naga(source, file_path).unwrap();
            let names: Vec<&str> = module
                .entry_points
                .iter()
                .map(|ep| ep.name.as_str())
                .collect();
            assert!(names.contains(&"vs_main"), "{file_path}: {names:?}");
            assert!(names.contains(&"fs_main"), "{file_path}: {names:?}");
        }
    }

    // The GL backend translates through naga's GLSL writer, which rejects
    // constructs the WGSL validator accepts (e.g. `textureLoad` on depth).
    #[test]
    fn every_entry_point_translates_to_glsl() {
        use naga::back::glsl;

        let mut composer = ShaderComposer::new().unwrap();
        for &(source, file_path) in sources::ALL {
            let module = composer.compose_naga(source, file_path).unwrap();
            let info = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::all(),
            )
            .validate(&module)
            .unwrap();
            let options = glsl::Options::default();
            for ep in &module.entry_points {
                let pipeline = glsl::PipelineOptions {
                    shader_stage: ep.stage,
                    entry_point: ep.name.clone(),
                    multiview: None,
                };
                let mut out = String::new();
                let _ = glsl::Writer::new(
                    &mut out,
                    &module,
                    &info,
                    &options,
                    &pipeline,
                    naga::proc::BoundsCheckPolicies::default(),
                )
                .and_then(|mut writer| writer.write())
                .unwrap_or_else(|e| {
                    panic!("{file_path}::{} has no GLSL form: {e}", ep.name)
                });
            }
        }
    }

    #[test]
    fn broken_source_reports_shader_error() {
        let mut composer = ShaderComposer::new().unwrap();
        let err = composer
            .compose_naga("fn broken( {", "broken.wgsl")
            .unwrap_err();
        assert!(matches!(err, DeferredError::Shader(_)));
    }
}
