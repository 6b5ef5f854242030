//! Per-frame pass bookkeeping and the presented-buffer selection.

use crate::error::DeferredError;

/// The passes of one frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePass {
    /// Clear every framebuffer.
    Clear,
    /// Behaviours, world matrices and object uploads.
    Transforms,
    /// Shadow casters into the shadow map.
    Shadow,
    /// Renderables into the G-buffer.
    Geometry,
    /// Illumination composite over the G-buffer.
    Lighting,
    /// Post effect over the composite.
    Post,
    /// Selected buffer to the output view.
    Present,
}

impl FramePass {
    /// The pass that must already have run this frame. The chain is
    /// linear, so lighting also sees this frame's shadow map.
    #[must_use]
    pub const fn requires(self) -> Option<Self> {
        match self {
            Self::Clear => None,
            Self::Transforms => Some(Self::Clear),
            Self::Shadow => Some(Self::Transforms),
            Self::Geometry => Some(Self::Shadow),
            Self::Lighting => Some(Self::Geometry),
            Self::Post => Some(Self::Lighting),
            Self::Present => Some(Self::Post),
        }
    }
}

/// Passes executed in the current frame.
#[derive(Debug, Default, Clone)]
pub struct PassLog {
    executed: Vec<FramePass>,
}

impl PassLog {
    /// Forget the previous frame.
    pub fn begin_frame(&mut self) {
        self.executed.clear();
    }

    /// Whether `pass` ran this frame.
    #[must_use]
    pub fn has_run(&self, pass: FramePass) -> bool {
        self.executed.contains(&pass)
    }

    /// Passes so far, in order.
    #[must_use]
    pub fn passes(&self) -> &[FramePass] {
        &self.executed
    }

    /// Check that `pass` may run now, then record it.
    ///
    /// # Errors
    ///
    /// [`DeferredError::PassOrder`] if the pass it depends on has not run.
    pub fn record(&mut self, pass: FramePass) -> Result<(), DeferredError> {
        if let Some(requires) = pass.requires() {
            if !self.has_run(requires) {
                log::error!("{pass:?} attempted before {requires:?}");
                return Err(DeferredError::PassOrder {
                    attempted: pass,
                    requires,
                });
            }
        }
        self.executed.push(pass);
        Ok(())
    }
}

/// Which buffer reaches the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Post-processed composite.
    #[default]
    Composited,
    /// All four G-buffer channels.
    GBuffer,
    /// Illumination buffer with the reference mesh.
    Illumination,
    /// Albedo channel.
    Color,
    /// G-buffer depth.
    Depth,
    /// Normal channel.
    Normal,
    /// World-position channel.
    Position,
}

impl DisplayMode {
    /// Every mode, in cycling order.
    pub const ALL: [Self; 7] = [
        Self::Composited,
        Self::GBuffer,
        Self::Illumination,
        Self::Color,
        Self::Depth,
        Self::Normal,
        Self::Position,
    ];

    /// Switch to `mode`, or back to [`Composited`](Self::Composited) if it
    /// is already shown.
    #[must_use]
    pub fn toggle(self, mode: Self) -> Self {
        if self == mode {
            Self::Composited
        } else {
            mode
        }
    }

    /// The mode after this one in [`ALL`](Self::ALL), wrapping.
    #[must_use]
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(log: &mut PassLog, passes: &[FramePass]) -> Result<(), DeferredError> {
        passes.iter().try_for_each(|&p| log.record(p))
    }

    #[test]
    fn full_frame_in_order_is_accepted() {
        let mut log = PassLog::default();
        let frame = [
            FramePass::Clear,
            FramePass::Transforms,
            FramePass::Shadow,
            FramePass::Geometry,
            FramePass::Lighting,
            FramePass::Post,
            FramePass::Present,
        ];
        run(&mut log, &frame).unwrap();
        assert_eq!(log.passes(), frame);
    }

    #[test]
    fn lighting_before_geometry_is_rejected() {
        let mut log = PassLog::default();
        run(&mut log, &[FramePass::Clear, FramePass::Transforms]).unwrap();
        let err = log.record(FramePass::Lighting).unwrap_err();
        assert!(matches!(
            err,
            DeferredError::PassOrder {
                attempted: FramePass::Lighting,
                requires: FramePass::Geometry,
            }
        ));
        assert!(!log.has_run(FramePass::Lighting));
    }

    #[test]
    fn geometry_and_lighting_without_shadow_are_rejected() {
        let mut log = PassLog::default();
        run(&mut log, &[FramePass::Clear, FramePass::Transforms]).unwrap();
        let err = log.record(FramePass::Geometry).unwrap_err();
        assert!(matches!(
            err,
            DeferredError::PassOrder {
                attempted: FramePass::Geometry,
                requires: FramePass::Shadow,
            }
        ));
        // Lighting stays blocked behind the missing geometry.
        assert!(log.record(FramePass::Lighting).is_err());

        // A rejected pass is not logged; recording shadow unblocks the chain.
        let mut log = PassLog::default();
        run(&mut log, &[FramePass::Clear, FramePass::Transforms]).unwrap();
        assert!(log.record(FramePass::Geometry).is_err());
        run(&mut log, &[FramePass::Shadow, FramePass::Geometry, FramePass::Lighting]).unwrap();
        assert_eq!(
            log.passes(),
            [
                FramePass::Clear,
                FramePass::Transforms,
                FramePass::Shadow,
                FramePass::Geometry,
                FramePass::Lighting,
            ]
        );
    }

    #[test]
    fn begin_frame_resets_history() {
        let mut log = PassLog::default();
        run(
            &mut log,
            &[
                FramePass::Clear,
                FramePass::Transforms,
                FramePass::Shadow,
                FramePass::Geometry,
                FramePass::Lighting,
            ],
        )
        .unwrap();
        log.begin_frame();
        assert!(log.record(FramePass::Post).is_err());
    }

    #[test]
    fn display_toggles_return_to_composited() {
        let mode = DisplayMode::Composited.toggle(DisplayMode::GBuffer);
        assert_eq!(mode, DisplayMode::GBuffer);
        assert_eq!(mode.toggle(DisplayMode::Illumination), DisplayMode::Illumination);
        assert_eq!(mode.toggle(DisplayMode::GBuffer), DisplayMode::Composited);
        assert_eq!(DisplayMode::Position.next(), DisplayMode::Composited);
    }
}
