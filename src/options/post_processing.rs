use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DeferredError;
use crate::renderer::postprocess::CubeLut;
use crate::renderer::EffectKind;

/// Which post effect runs over the composite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectSelection {
    /// Copy the composite unchanged.
    #[default]
    Passthrough,
    /// Sepia toning.
    Sepia,
    /// Luminance greyscale.
    Greyscale,
    /// 3D LUT grading.
    ColorCorrect,
    /// Animated noise.
    FilmGrain,
    /// Block pixelation.
    Pixelate,
    /// Bright-pass glow.
    Bloom,
}

/// Post effect choice and its parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostProcessingOptions {
    /// Active effect.
    pub effect: EffectSelection,
    /// Blend amount for sepia, greyscale, colour correction and grain.
    pub intensity: f32,
    /// Block size in pixels for pixelation.
    pub pixel_size: f32,
    /// Bloom bright-pass threshold.
    pub bloom_threshold: f32,
    /// Bloom blur iterations.
    pub bloom_passes: u32,
    /// `.cube` file for colour correction, relative to the options file.
    pub lut_path: Option<PathBuf>,
}

impl Default for PostProcessingOptions {
    fn default() -> Self {
        Self {
            effect: EffectSelection::Passthrough,
            intensity: 1.0,
            pixel_size: 8.0,
            bloom_threshold: 0.8,
            bloom_passes: 4,
            lut_path: None,
        }
    }
}

impl PostProcessingOptions {
    /// Build the effect, loading the LUT (relative to `base_dir`) when
    /// colour correction is selected. Out-of-range values are clamped.
    pub fn effect_kind(&self, base_dir: &Path) -> Result<EffectKind, DeferredError> {
        let mut kind = match self.effect {
            EffectSelection::Passthrough => return Ok(EffectKind::Passthrough),
            EffectSelection::Sepia => EffectKind::Sepia { intensity: 0.0 },
            EffectSelection::Greyscale => EffectKind::Greyscale { intensity: 0.0 },
            EffectSelection::ColorCorrect => {
                let lut = match &self.lut_path {
                    Some(path) => Some(Arc::new(CubeLut::from_path(&base_dir.join(path))?)),
                    None => None,
                };
                EffectKind::ColorCorrect { strength: 0.0, lut }
            }
            EffectSelection::FilmGrain => EffectKind::FilmGrain { intensity: 0.0 },
            EffectSelection::Pixelate => EffectKind::Pixelate { intensity: 1.0 },
            EffectSelection::Bloom => EffectKind::Bloom {
                threshold: 0.0,
                passes: 1,
            },
        };
        let _ = kind.set_param("intensity", self.intensity);
        let _ = kind.set_param("strength", self.intensity);
        if self.effect == EffectSelection::Pixelate {
            let _ = kind.set_param("intensity", self.pixel_size);
        }
        let _ = kind.set_param("threshold", self.bloom_threshold);
        let _ = kind.set_param("passes", self.bloom_passes as f32);
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_builds_clamped_effect() {
        let opts = PostProcessingOptions {
            effect: EffectSelection::Bloom,
            bloom_threshold: 0.6,
            bloom_passes: 99,
            ..PostProcessingOptions::default()
        };
        let kind = opts.effect_kind(Path::new(".")).unwrap();
        assert_eq!(
            kind,
            EffectKind::Bloom {
                threshold: 0.6,
                passes: crate::renderer::postprocess::effect::MAX_BLOOM_PASSES,
            }
        );
    }

    #[test]
    fn pixelate_uses_pixel_size() {
        let opts = PostProcessingOptions {
            effect: EffectSelection::Pixelate,
            pixel_size: 12.0,
            ..PostProcessingOptions::default()
        };
        assert_eq!(
            opts.effect_kind(Path::new(".")).unwrap(),
            EffectKind::Pixelate { intensity: 12.0 }
        );
    }

    #[test]
    fn missing_lut_file_is_an_error() {
        let opts = PostProcessingOptions {
            effect: EffectSelection::ColorCorrect,
            lut_path: Some(PathBuf::from("does/not/exist.cube")),
            ..PostProcessingOptions::default()
        };
        assert!(opts.effect_kind(Path::new(".")).is_err());
    }
}
