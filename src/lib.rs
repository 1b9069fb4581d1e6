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


//! Depth-aware post-processing effects: focal blur and contact shadows.
//!
//! An effect redirects a scene into an off-screen color+depth
//! [`RenderTarget`], then runs a full-screen shader that reads both
//! attachments and writes the final image to the host's output.
//!
//! # Key entry points
//!
//! - [`BlurEffect`] - depth of field around a focal point captured with
//!   `focus_here` during the draw
//! - [`ContactShadowEffect`] - darkening from nearby geometry in front of
//!   each pixel
//! - [`RenderTarget`] - the off-screen attachments, usable on their own
//! - [`host::Host`] - the graphics context effects render through
//! - [`options::EffectOptions`] - TOML-backed effect parameters
//!
//! # Hosts
//!
//! [`gpu::host::GpuHost`] runs the WGSL passes on wgpu.
//! [`host::software::SoftwareHost`] runs their CPU mirror in
//! [`shading`] and needs no graphics device.
//!
//! ```
//! use depthfx::host::software::SoftwareHost;
//! use depthfx::{BlurEffect, EffectError, Extent};
//! use glam::{Vec3, Vec4};
//!
//! let mut host = SoftwareHost::new(Extent::new(64, 48));
//! let mut blur = BlurEffect::new(&mut host)?;
//! blur.draw(&mut host, |scene| -> Result<(), EffectError> {
//!     scene.translate(Vec3::new(0.0, 0.0, -120.0));
//!     scene.draw_sphere(20.0, Vec4::ONE);
//!     scene.focus_here();
//!     Ok(())
//! })?;
//! # Ok::<(), EffectError>(())
//! ```

pub mod camera;
pub mod error;
pub mod gpu;
pub mod host;
pub mod options;
pub mod renderer;
pub mod shading;

pub use error::{EffectError, InvalidState};
pub use host::{Extent, Host, Output};
pub use options::{EffectOptions, JitterMode};
pub use renderer::postprocess::contact_shadow::{
    ContactShadow, ContactShadowEffect,
};
pub use renderer::postprocess::effect_pass::{
    DrawScope, EffectPass, EffectState, ShaderPass,
};
pub use renderer::postprocess::focal_blur::{BlurEffect, FocalBlur};
pub use renderer::render_target::{AttachmentHandle, RenderTarget};
