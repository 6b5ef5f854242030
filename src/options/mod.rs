//! Viewer options with TOML preset support.
//!
//! Lighting, shadow, post-processing, camera, debug and keybinding settings
//! are consolidated here. Options serialize to/from TOML; the viewer reads
//! `assets/config.toml` and presets live next to it.

mod camera;
mod debug;
mod keybindings;
mod lighting;
mod post_processing;
mod shadow;

use std::path::Path;

pub use camera::CameraOptions;
pub use debug::DebugOptions;
pub use keybindings::KeybindingOptions;
pub use lighting::LightingOptions;
pub use post_processing::{EffectSelection, PostProcessingOptions};
use serde::{Deserialize, Serialize};
pub use shadow::ShadowOptions;

use crate::error::DeferredError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[lighting]`) work correctly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Options {
    /// Sun and point-light parameters.
    pub lighting: LightingOptions,
    /// Shadow-map parameters.
    pub shadow: ShadowOptions,
    /// Post effect selection.
    pub post_processing: PostProcessingOptions,
    /// Camera projection parameters.
    pub camera: CameraOptions,
    /// Diagnostics.
    pub debug: DebugOptions,
    /// Keyboard binding options.
    pub keybindings: KeybindingOptions,
}

impl Options {
    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, DeferredError> {
        let content = std::fs::read_to_string(path).map_err(DeferredError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text and rebuild the key lookup.
    pub fn from_toml(content: &str) -> Result<Self, DeferredError> {
        let mut opts: Self = toml::from_str(content)
            .map_err(|e| DeferredError::OptionsParse(e.to_string()))?;
        opts.keybindings.rebuild_reverse_map();
        Ok(opts)
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), DeferredError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DeferredError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DeferredError::Io)?;
        }
        std::fs::write(path, content).map_err(DeferredError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyAction;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed = Options::from_toml(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[lighting]
ambient_power = 0.3

[post_processing]
effect = "sepia"
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.lighting.ambient_power, 0.3);
        assert_eq!(opts.post_processing.effect, EffectSelection::Sepia);
        // Everything else should be default
        assert!(opts.lighting.sun_enabled);
        assert_eq!(opts.shadow.resolution, 4096);
        assert_eq!(opts.camera, CameraOptions::default());
    }

    #[test]
    fn keybinding_lookup() {
        let opts = Options::default();
        assert_eq!(opts.keybindings.lookup("KeyT"), Some(KeyAction::ToggleOrtho));
        assert_eq!(
            opts.keybindings.lookup("NumpadSubtract"),
            Some(KeyAction::CycleSelectionPrev)
        );
        assert_eq!(opts.keybindings.lookup("KeyZ"), None);
    }

    #[test]
    fn loaded_bindings_rebuild_reverse_map() {
        let toml_str = r#"
[keybindings.bindings]
toggle_ortho = "KeyP"
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.keybindings.lookup("KeyP"), Some(KeyAction::ToggleOrtho));
        assert_eq!(opts.keybindings.key_for(KeyAction::ToggleIllumView), None);
    }

    #[test]
    fn shipped_config_parses() {
        let opts =
            Options::from_toml(include_str!("../../assets/config.toml")).unwrap();
        assert_eq!(opts.keybindings, KeybindingOptions::default());
        assert_eq!(opts.shadow, ShadowOptions::default());
    }

    #[test]
    fn malformed_toml_is_an_options_error() {
        let err = Options::from_toml("[lighting\nambient_power = ").unwrap_err();
        assert!(matches!(err, DeferredError::OptionsParse(_)));
    }

    #[test]
    fn lighting_options_build_light_blocks() {
        let lighting = LightingOptions {
            sun_direction: [0.0, 0.0, -2.0],
            ..LightingOptions::default()
        };
        let sun = lighting.sun();
        assert_eq!(sun.direction, [0.0, 0.0, -2.0, 0.0]);
        assert_eq!(lighting.point_light().position, [0.0, 5.0, 0.0, 1.0]);
    }
}
