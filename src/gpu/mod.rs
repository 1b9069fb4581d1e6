//! wgpu backend.
//!
//! Device initialization, WGSL composition through naga-oil, the
//! screen-space pipeline helpers, and [`host::GpuHost`], the [`Host`]
//! implementation the effects run on.
//!
//! [`Host`]: crate::host::Host

/// wgpu-backed [`crate::host::Host`].
pub mod host;
/// Shared wgpu boilerplate for full-screen pipelines.
pub mod pipeline_helpers;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
