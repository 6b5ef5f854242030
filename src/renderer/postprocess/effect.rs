//! Effect kinds and their adjustable parameters.

use std::sync::Arc;

use super::lut::CubeLut;

/// One named numeric control of an effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParam {
    /// Name accepted by [`EffectKind::set_param`].
    pub name: &'static str,
    /// Current value.
    pub value: f32,
    /// Inclusive lower bound.
    pub min: f32,
    /// Inclusive upper bound.
    pub max: f32,
}

impl EffectParam {
    const fn new(name: &'static str, value: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            value,
            min,
            max,
        }
    }
}

/// Largest bloom blur iteration count.
pub const MAX_BLOOM_PASSES: u32 = 8;

/// The closed set of full-screen effects.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EffectKind {
    /// Copy the composite unchanged.
    #[default]
    Passthrough,
    /// Sepia toning blended by `intensity`.
    Sepia {
        /// 0 = original, 1 = full sepia.
        intensity: f32,
    },
    /// Luminance greyscale blended by `intensity`.
    Greyscale {
        /// 0 = original, 1 = full greyscale.
        intensity: f32,
    },
    /// 3D LUT grading blended by `strength`; identity when `lut` is `None`.
    ColorCorrect {
        /// 0 = original, 1 = fully graded.
        strength: f32,
        /// Parsed table.
        lut: Option<Arc<CubeLut>>,
    },
    /// Per-pixel noise reseeded every frame.
    FilmGrain {
        /// Noise amplitude.
        intensity: f32,
    },
    /// Block pixelation; `intensity` is the block edge in pixels.
    Pixelate {
        /// Block size.
        intensity: f32,
    },
    /// Bright-pass, `passes` separable blur iterations, additive combine.
    Bloom {
        /// Luminance above which pixels glow.
        threshold: f32,
        /// Blur iterations (each one horizontal + vertical).
        passes: u32,
    },
}

impl EffectKind {
    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Sepia { .. } => "sepia",
            Self::Greyscale { .. } => "greyscale",
            Self::ColorCorrect { .. } => "color_correct",
            Self::FilmGrain { .. } => "film_grain",
            Self::Pixelate { .. } => "pixelate",
            Self::Bloom { .. } => "bloom",
        }
    }

    /// Adjustable controls with their ranges.
    pub fn params(&self) -> Vec<EffectParam> {
        match *self {
            Self::Passthrough => Vec::new(),
            Self::Sepia { intensity } | Self::Greyscale { intensity } => {
                vec![EffectParam::new("intensity", intensity, 0.0, 1.0)]
            }
            Self::ColorCorrect { strength, .. } => {
                vec![EffectParam::new("strength", strength, 0.0, 1.0)]
            }
            Self::FilmGrain { intensity } => {
                vec![EffectParam::new("intensity", intensity, 0.0, 0.5)]
            }
            Self::Pixelate { intensity } => {
                vec![EffectParam::new("intensity", intensity, 1.0, 64.0)]
            }
            Self::Bloom { threshold, passes } => vec![
                EffectParam::new("threshold", threshold, 0.0, 1.0),
                EffectParam::new("passes", passes as f32, 1.0, MAX_BLOOM_PASSES as f32),
            ],
        }
    }

    /// Set control `name`, clamped to its range. Returns `false` if this
    /// effect has no such control.
    pub fn set_param(&mut self, name: &str, value: f32) -> bool {
        let Some(range) = self.params().into_iter().find(|p| p.name == name) else {
            return false;
        };
        let v = value.clamp(range.min, range.max);
        match (self, name) {
            (
                Self::Sepia { intensity }
                | Self::Greyscale { intensity }
                | Self::FilmGrain { intensity }
                | Self::Pixelate { intensity },
                "intensity",
            ) => *intensity = v,
            (Self::ColorCorrect { strength, .. }, "strength") => *strength = v,
            (Self::Bloom { threshold, .. }, "threshold") => *threshold = v,
            (Self::Bloom { passes, .. }, "passes") => *passes = v.round() as u32,
            _ => return false,
        }
        true
    }

    /// Value the shaders read from `values.x`.
    pub(crate) fn primary(&self) -> f32 {
        match *self {
            Self::Passthrough => 0.0,
            Self::Sepia { intensity }
            | Self::Greyscale { intensity }
            | Self::FilmGrain { intensity }
            | Self::Pixelate { intensity } => intensity,
            Self::ColorCorrect { strength, .. } => strength,
            // combine strength
            Self::Bloom { .. } => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_param_clamps_to_range() {
        let mut sepia = EffectKind::Sepia { intensity: 0.5 };
        assert!(sepia.set_param("intensity", 3.0));
        assert_eq!(sepia, EffectKind::Sepia { intensity: 1.0 });
        assert!(sepia.set_param("intensity", -1.0));
        assert_eq!(sepia.params()[0].value, 0.0);
    }

    #[test]
    fn unknown_params_are_rejected() {
        let mut grain = EffectKind::FilmGrain { intensity: 0.1 };
        assert!(!grain.set_param("threshold", 0.5));
        assert!(!EffectKind::Passthrough.set_param("intensity", 1.0));
        assert_eq!(grain, EffectKind::FilmGrain { intensity: 0.1 });
    }

    #[test]
    fn bloom_passes_round_and_clamp() {
        let mut bloom = EffectKind::Bloom {
            threshold: 0.8,
            passes: 2,
        };
        assert!(bloom.set_param("passes", 3.6));
        assert!(matches!(bloom, EffectKind::Bloom { passes: 4, .. }));
        assert!(bloom.set_param("passes", 100.0));
        assert!(matches!(
            bloom,
            EffectKind::Bloom {
                passes: MAX_BLOOM_PASSES,
                ..
            }
        ));
        let names: Vec<&str> = bloom.params().iter().map(|p| p.name).collect();
        assert_eq!(names, ["threshold", "passes"]);
    }
}
