//! Full-screen post effects applied to the lit composite.
//!
//! Effects form a closed [`EffectKind`] enum; each exposes its adjustable
//! controls through [`EffectKind::params`] so UI code never needs to know
//! the concrete variant.

pub mod effect;
pub mod lut;
pub mod post_effect;

pub use effect::{EffectKind, EffectParam};
pub use lut::CubeLut;
pub use post_effect::{EffectParams, PostEffect};
