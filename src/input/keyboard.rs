use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};

use super::KeyAction;
use crate::options::KeybindingOptions;

/// Set of currently held keys, named in the `winit::keyboard::KeyCode`
/// debug format (`"KeyT"`, `"F1"`, `"NumpadAdd"`).
#[derive(Debug, Default, Clone)]
pub struct KeyboardState {
    pressed: FxHashSet<String>,
}

impl KeyboardState {
    /// Record a key press.
    pub fn key_down(&mut self, key: &str) {
        let _ = self.pressed.insert(key.to_owned());
    }

    /// Record a key release.
    pub fn key_up(&mut self, key: &str) {
        let _ = self.pressed.remove(key);
    }

    /// Whether `key` is held.
    #[must_use]
    pub fn is_pressed(&self, key: &str) -> bool {
        self.pressed.contains(key)
    }

    /// Movement axes from the held WASD/QE keys: x right, y up, z back.
    #[must_use]
    pub fn axis_input(&self) -> Vec3 {
        let axis = |neg: &str, pos: &str| {
            f32::from(u8::from(self.is_pressed(pos)))
                - f32::from(u8::from(self.is_pressed(neg)))
        };
        Vec3::new(axis("KeyA", "KeyD"), axis("KeyQ", "KeyE"), axis("KeyW", "KeyS"))
    }

    /// Forget every held key (focus loss).
    pub fn release_all(&mut self) {
        self.pressed.clear();
    }
}

/// Fires once on the transition from released to held.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyPressWatcher {
    was_pressed: bool,
}

impl KeyPressWatcher {
    /// Feed the current key state; `true` only on the first frame it is
    /// held.
    pub fn poll(&mut self, pressed: bool) -> bool {
        let fired = pressed && !self.was_pressed;
        self.was_pressed = pressed;
        fired
    }
}

/// One watcher per bound action.
#[derive(Debug, Default)]
pub struct ActionPoller {
    watchers: FxHashMap<KeyAction, KeyPressWatcher>,
}

impl ActionPoller {
    /// Poll every bound action. Nothing fires while the UI has focus, and
    /// keys held across the focus change do not fire when it is released.
    pub fn poll(
        &mut self,
        keyboard: &KeyboardState,
        bindings: &KeybindingOptions,
        ui_has_focus: bool,
    ) -> Vec<KeyAction> {
        let mut fired = Vec::new();
        for action in KeyAction::ALL {
            let Some(key) = bindings.key_for(action) else {
                continue;
            };
            let watcher = self.watchers.entry(action).or_default();
            if watcher.poll(keyboard.is_pressed(key)) && !ui_has_focus {
                fired.push(action);
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watcher_fires_once_per_press() {
        let mut w = KeyPressWatcher::default();
        assert!(w.poll(true));
        assert!(!w.poll(true));
        assert!(!w.poll(false));
        assert!(w.poll(true));
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut keyboard = KeyboardState::default();
        keyboard.key_down("KeyW");
        keyboard.key_down("KeyD");
        assert_eq!(keyboard.axis_input(), Vec3::new(1.0, 0.0, -1.0));
        keyboard.key_down("KeyA");
        assert_eq!(keyboard.axis_input(), Vec3::new(0.0, 0.0, -1.0));
        keyboard.release_all();
        assert_eq!(keyboard.axis_input(), Vec3::ZERO);
    }

    #[test]
    fn poller_maps_default_bindings() {
        let bindings = KeybindingOptions::default();
        let mut keyboard = KeyboardState::default();
        let mut poller = ActionPoller::default();

        keyboard.key_down("KeyT");
        keyboard.key_down("F1");
        let mut fired = poller.poll(&keyboard, &bindings, false);
        fired.sort();
        assert_eq!(fired, [KeyAction::ToggleOrtho, KeyAction::ToggleGBufferView]);
        assert!(poller.poll(&keyboard, &bindings, false).is_empty());

        keyboard.key_up("KeyT");
        assert!(poller.poll(&keyboard, &bindings, false).is_empty());
        keyboard.key_down("KeyT");
        assert_eq!(poller.poll(&keyboard, &bindings, false), [KeyAction::ToggleOrtho]);
    }

    #[test]
    fn ui_focus_swallows_presses() {
        let bindings = KeybindingOptions::default();
        let mut keyboard = KeyboardState::default();
        let mut poller = ActionPoller::default();

        keyboard.key_down("NumpadAdd");
        assert!(poller.poll(&keyboard, &bindings, true).is_empty());
        // still held after focus returns: no late trigger
        assert!(poller.poll(&keyboard, &bindings, false).is_empty());
    }
}
