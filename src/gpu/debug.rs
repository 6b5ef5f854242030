//! Driver diagnostic routing.
//!
//! wgpu reports errors that are not captured by an error scope through a
//! per-device callback. Each one is turned into a [`DebugMessage`] and
//! logged at a level derived from its severity. This is the only channel
//! for GPU-side failures; the running application otherwise ignores them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Which part of the stack dispatched a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSource {
    /// Core graphics API validation.
    Api,
    /// Window system / surface.
    WindowSystem,
    /// Shader translation and validation.
    ShaderCompiler,
    /// Third-party layer.
    ThirdParty,
    /// Raised by this crate.
    Application,
    /// Anything else.
    Other,
}

impl DebugSource {
    /// Short tag used as the log prefix.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Api => "DEBUG",
            Self::WindowSystem => "WINDOW",
            Self::ShaderCompiler => "SHADER",
            Self::ThirdParty => "THIRD PARTY",
            Self::Application => "APP",
            Self::Other => "OTHER",
        }
    }
}

/// What kind of problem a message describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugType {
    /// Invalid API usage.
    Error,
    /// Allocation failure.
    OutOfMemory,
    /// Driver-internal failure.
    Internal,
    /// Informational.
    Other,
}

/// Message severity, from notification to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugSeverity {
    /// Informational notification.
    Notification,
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
}

impl DebugSeverity {
    /// Log level for this severity. Notifications are dropped unless
    /// `log_notifications` is set.
    pub fn log_level(self, log_notifications: bool) -> Option<log::Level> {
        match self {
            Self::Notification if log_notifications => Some(log::Level::Info),
            Self::Notification => None,
            Self::Low => Some(log::Level::Info),
            Self::Medium => Some(log::Level::Warn),
            Self::High => Some(log::Level::Error),
        }
    }
}

/// One driver diagnostic: `(source, type, id, severity, message)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugMessage {
    /// Dispatching component.
    pub source: DebugSource,
    /// Message category.
    pub kind: DebugType,
    /// Sequential id, unique per device.
    pub id: u64,
    /// Severity.
    pub severity: DebugSeverity,
    /// Human-readable text.
    pub message: String,
}

/// Guess the dispatching component from a validation description.
pub fn source_from_description(description: &str) -> DebugSource {
    let lower = description.to_ascii_lowercase();
    if lower.contains("shader") || lower.contains("wgsl") {
        DebugSource::ShaderCompiler
    } else if lower.contains("surface") || lower.contains("swapchain") {
        DebugSource::WindowSystem
    } else {
        DebugSource::Api
    }
}

/// Convert an uncaptured wgpu error into a [`DebugMessage`].
pub fn classify(error: &wgpu::Error, id: u64) -> DebugMessage {
    match error {
        wgpu::Error::OutOfMemory { .. } => DebugMessage {
            source: DebugSource::Api,
            kind: DebugType::OutOfMemory,
            id,
            severity: DebugSeverity::High,
            message: error.to_string(),
        },
        wgpu::Error::Validation { description, .. } => DebugMessage {
            source: source_from_description(description),
            kind: DebugType::Error,
            id,
            severity: DebugSeverity::High,
            message: description.clone(),
        },
        _ => DebugMessage {
            source: DebugSource::Other,
            kind: DebugType::Internal,
            id,
            severity: DebugSeverity::Medium,
            message: error.to_string(),
        },
    }
}

/// Log a message at its severity-mapped level.
pub fn report(message: &DebugMessage, log_notifications: bool) {
    if let Some(level) = message.severity.log_level(log_notifications) {
        log::log!(
            level,
            "[{}] #{} {:?}: {}",
            message.source.tag(),
            message.id,
            message.kind,
            message.message
        );
    }
}

/// Route the device's uncaptured errors to the log.
pub fn install(device: &wgpu::Device, log_notifications: bool) {
    let counter = Arc::new(AtomicU64::new(0));
    device.on_uncaptured_error(Box::new(move |error| {
        let id = counter.fetch_add(1, Ordering::Relaxed);
        report(&classify(&error, id), log_notifications);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_to_log_levels() {
        assert_eq!(DebugSeverity::Low.log_level(false), Some(log::Level::Info));
        assert_eq!(
            DebugSeverity::Medium.log_level(false),
            Some(log::Level::Warn)
        );
        assert_eq!(
            DebugSeverity::High.log_level(false),
            Some(log::Level::Error)
        );
    }

    #[test]
    fn notifications_are_opt_in() {
        assert_eq!(DebugSeverity::Notification.log_level(false), None);
        assert_eq!(
            DebugSeverity::Notification.log_level(true),
            Some(log::Level::Info)
        );
    }

    #[test]
    fn shader_failures_are_attributed_to_the_compiler() {
        assert_eq!(
            source_from_description("Shader module 'ambient' is invalid"),
            DebugSource::ShaderCompiler
        );
        assert_eq!(
            source_from_description("Surface does not support the format"),
            DebugSource::WindowSystem
        );
        assert_eq!(
            source_from_description("Buffer is still mapped"),
            DebugSource::Api
        );
    }
}
