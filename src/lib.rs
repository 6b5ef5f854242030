// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Deferred-lighting render pipeline built on wgpu.
//!
//! Geometry is rasterized once into a G-buffer (albedo, normals, world
//! position, specular). Lighting then runs as a chain of full-screen
//! stages that accumulate into an [`renderer::IlluminationBuffer`], and a
//! configurable [`renderer::PostEffect`] finishes the frame before it is
//! presented.
//!
//! # Key entry points
//!
//! - [`engine::DeferredRenderer`] - owns the GPU resources and runs a frame
//! - [`scene::Scene`] - ECS world with the camera, renderers and behaviours
//! - [`options::Options`] - TOML-backed runtime configuration
//! - [`gpu::binding::BindingState`] - the slot table every pass binds through
//!
//! # Frame
//!
//! Each frame runs clear, transform update, shadow, geometry, lighting,
//! post and present in that order. [`engine::PassLog`] rejects a pass whose
//! prerequisites have not run, and [`engine::DisplayMode`] picks what the
//! present pass shows (the composited image or a debug view).

pub mod camera;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod input;
pub mod options;
pub mod renderer;
pub mod scene;
pub mod util;
