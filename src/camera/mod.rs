//! Projection and transform state shared by the hosts.
//!
//! Provides depth linearization and view-position reconstruction for the
//! effect passes, and the model-view stack hosts expose to `focus_here`.

/// Perspective projection parameters and depth-buffer math.
pub mod projection;
/// Host-side model-view transform stack.
pub mod transform;
