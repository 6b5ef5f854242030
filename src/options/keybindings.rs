use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::input::KeyAction;

/// Action → key bindings. Keys use the winit `KeyCode` debug names.
///
/// A `[keybindings.bindings]` table replaces the whole default set, so a
/// preset lists every binding it wants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeybindingOptions {
    /// Bound key per action, serialized in action order.
    pub bindings: BTreeMap<KeyAction, String>,
    #[serde(skip)]
    by_key: FxHashMap<String, KeyAction>,
}

impl Default for KeybindingOptions {
    fn default() -> Self {
        let bindings = [
            (KeyAction::CycleSelectionNext, "NumpadAdd"),
            (KeyAction::CycleSelectionPrev, "NumpadSubtract"),
            (KeyAction::ToggleOrtho, "KeyT"),
            (KeyAction::ToggleGBufferView, "F1"),
            (KeyAction::ToggleIllumView, "F2"),
            (KeyAction::ToggleColorView, "F3"),
            (KeyAction::ToggleRelative, "KeyY"),
        ]
        .into_iter()
        .map(|(action, key)| (action, key.to_owned()))
        .collect();

        let mut opts = Self {
            bindings,
            by_key: FxHashMap::default(),
        };
        opts.rebuild_reverse_map();
        opts
    }
}

impl KeybindingOptions {
    /// Refresh the key → action index after `bindings` changed (serde
    /// skips it).
    pub fn rebuild_reverse_map(&mut self) {
        self.by_key = self
            .bindings
            .iter()
            .map(|(&action, key)| (key.clone(), action))
            .collect();
    }

    /// Action bound to `key`.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<KeyAction> {
        self.by_key.get(key).copied()
    }

    /// Key bound to `action`, if any.
    #[must_use]
    pub fn key_for(&self, action: KeyAction) -> Option<&str> {
        self.bindings.get(&action).map(String::as_str)
    }
}
