//! The host graphics context that effects render through.
//!
//! Effects never call a graphics API directly. Texture allocation, output
//! binding, shader compilation, and the full-screen composite all go through
//! the [`Host`] trait, which also answers the two queries the passes need
//! from the surrounding renderer: the active projection and the current
//! cumulative model-view transform.
//!
//! Two hosts ship with the crate: [`crate::gpu::host::GpuHost`] on wgpu, and
//! [`software::SoftwareHost`], a headless CPU host that runs the same passes
//! through [`crate::shading`].

pub mod software;

use std::fmt;

use glam::Mat4;

use crate::camera::projection::Projection;
use crate::error::EffectError;
use crate::renderer::postprocess::uniforms::{
    ContactShadowUniforms, FocalBlurUniforms, PassUniforms,
};

/// Pixel dimensions of an output or attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Create an extent from width and height.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` if either dimension is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of texels covered.
    #[must_use]
    pub const fn texel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Width divided by height (1.0 for empty extents).
    #[must_use]
    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Component-wise minimum of two extents.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.width.min(other.width), self.height.min(other.height))
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which half of a render target an attachment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    /// Color image sampled by the composite pass.
    Color,
    /// Depth image, `[0, 1]` with 1.0 at the far plane.
    Depth,
}

/// Where drawing commands currently land.
#[derive(Debug, Clone, PartialEq)]
pub enum Output<T> {
    /// The host's own display output.
    Screen,
    /// An off-screen color+depth pair.
    Attachments {
        /// Color attachment.
        color: T,
        /// Depth attachment.
        depth: T,
    },
}

impl<T> Output<T> {
    /// `true` when drawing goes to the display.
    #[must_use]
    pub const fn is_screen(&self) -> bool {
        matches!(self, Self::Screen)
    }
}

/// The full-screen programs a host must be able to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shader {
    /// Depth-of-field blur around a focal distance.
    FocalBlur,
    /// Proximity occlusion from reconstructed view positions.
    ContactShadow,
}

impl Shader {
    /// Every shader, in registration order.
    pub const ALL: [Self; 2] = [Self::FocalBlur, Self::ContactShadow];

    /// Human-readable label used for GPU objects and diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FocalBlur => "Focal Blur",
            Self::ContactShadow => "Contact Shadow",
        }
    }

    /// Size in bytes of the shader's uniform block.
    #[must_use]
    pub const fn uniform_size(self) -> usize {
        match self {
            Self::FocalBlur => size_of::<FocalBlurUniforms>(),
            Self::ContactShadow => size_of::<ContactShadowUniforms>(),
        }
    }
}

/// Textures sampled by a full-screen pass.
#[derive(Debug)]
pub struct PassInputs<'a, T> {
    /// Color attachment of the effect's render target.
    pub color: &'a T,
    /// Depth attachment of the effect's render target.
    pub depth: &'a T,
}

/// Graphics context consumed by render targets and effects.
///
/// The active output is explicit host state with strict swap discipline:
/// whoever binds an output is responsible for binding back what
/// [`Host::bind_output`] returned. [`crate::renderer::render_target::RenderTarget::with_output`]
/// is the scoped helper that does this on every exit path.
pub trait Host {
    /// Opaque, cheaply clonable texture handle.
    type Texture: Clone;
    /// A compiled full-screen program.
    type Program;

    /// Current dimensions of the host's display output.
    fn output_extent(&self) -> Extent;

    /// The projection the scene is being drawn with.
    fn projection(&self) -> Projection;

    /// Current cumulative model-view transform.
    fn model_view(&self) -> Mat4;

    /// Allocate one attachment.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::Allocation`] if the host cannot satisfy the
    /// request.
    fn allocate(
        &mut self,
        kind: AttachmentKind,
        extent: Extent,
    ) -> Result<Self::Texture, EffectError>;

    /// Dimensions of an allocated attachment.
    fn texture_extent(&self, texture: &Self::Texture) -> Extent;

    /// The output drawing currently lands in.
    fn active_output(&self) -> &Output<Self::Texture>;

    /// Make `output` active and return the previously active output.
    fn bind_output(
        &mut self,
        output: Output<Self::Texture>,
    ) -> Output<Self::Texture>;

    /// Reset the active output: transparent black color, depth at the far
    /// plane.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidState`] if the host has nowhere to
    /// draw.
    fn clear_output(&mut self) -> Result<(), EffectError>;

    /// Compile a full-screen program.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ShaderCompile`] if the shader does not compose
    /// or validate on this host.
    fn compile(&mut self, shader: Shader) -> Result<Self::Program, EffectError>;

    /// Run `program` over every pixel of the active output, sampling
    /// `inputs`, with depth testing and writing disabled.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidState`] if `uniforms` do not belong to
    /// `program` or the host has nowhere to draw.
    fn fullscreen_pass(
        &mut self,
        program: &Self::Program,
        inputs: PassInputs<'_, Self::Texture>,
        uniforms: &PassUniforms,
    ) -> Result<(), EffectError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_helpers() {
        let e = Extent::new(320, 200);
        assert_eq!(e.texel_count(), 64_000);
        assert!((e.aspect() - 1.6).abs() < 1e-6);
        assert!(!e.is_empty());
        assert!(Extent::new(0, 10).is_empty());
        assert_eq!(e.min(Extent::new(100, 400)), Extent::new(100, 200));
        assert_eq!(e.to_string(), "320x200");
    }

    #[test]
    fn uniform_sizes_are_gpu_aligned() {
        for shader in Shader::ALL {
            assert_eq!(shader.uniform_size() % 16, 0, "{}", shader.label());
        }
    }
}
