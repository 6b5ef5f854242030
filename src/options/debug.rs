use serde::{Deserialize, Serialize};

/// Diagnostics toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DebugOptions {
    /// Forward notification-severity driver messages to the log.
    pub log_notifications: bool,
    /// Frame cap for the viewer (0 = unlimited).
    pub target_fps: u32,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            log_notifications: false,
            target_fps: 0,
        }
    }
}
