//! Key-toggle input: bindable actions and the edge-triggered watchers
//! polled once per frame.

/// Pressed-key tracking and edge-triggered watchers.
pub mod keyboard;

pub use keyboard::{ActionPoller, KeyPressWatcher, KeyboardState};
use serde::{Deserialize, Serialize};

/// Viewer actions that can be bound to keys.
///
/// Serde serializes as `snake_case` strings so TOML presets stay readable:
/// ```toml
/// [keybindings.bindings]
/// toggle_ortho = "KeyT"
/// toggle_gbuffer_view = "F1"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    /// Select the next controllable entity.
    CycleSelectionNext,
    /// Select the previous controllable entity.
    CycleSelectionPrev,
    /// Switch the camera between perspective and orthographic.
    ToggleOrtho,
    /// Show every G-buffer channel.
    #[serde(rename = "toggle_gbuffer_view")]
    ToggleGBufferView,
    /// Show the illumination buffer.
    ToggleIllumView,
    /// Show the albedo channel.
    ToggleColorView,
    /// Move the selection relative to the camera instead of the world.
    ToggleRelative,
}

impl KeyAction {
    /// Every action, in the order watchers are polled.
    pub const ALL: [Self; 7] = [
        Self::CycleSelectionNext,
        Self::CycleSelectionPrev,
        Self::ToggleOrtho,
        Self::ToggleGBufferView,
        Self::ToggleIllumView,
        Self::ToggleColorView,
        Self::ToggleRelative,
    ];
}
