//! Uniform blocks for the full-screen passes.
//!
//! Layouts must match the WGSL structs in `assets/shaders/screen/`.

use crate::host::Shader;

/// Upper bound on samples per pixel; the WGSL loops are bounded by it.
pub const MAX_SAMPLES: u32 = 64;

/// Focal blur parameters uniform - must match WGSL struct
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FocalBlurUniforms {
    /// Output dimensions in pixels `[width, height]`.
    pub screen_size: [f32; 2],
    /// Near clipping plane distance.
    pub near: f32,
    /// Far clipping plane distance.
    pub far: f32,
    /// View-space distance of the focal point.
    pub focus_distance: f32,
    /// Blur radius in pixels per unit of depth divergence.
    pub intensity: f32,
    /// Samples per pixel, already clamped to `1..=MAX_SAMPLES`.
    pub sample_count: u32,
    /// Per-pass jitter seed.
    pub seed: u32,
}

/// Contact shadow parameters uniform - must match WGSL struct
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ContactShadowUniforms {
    /// Inverse projection matrix.
    pub inv_proj: [[f32; 4]; 4],
    /// Output dimensions in pixels `[width, height]`.
    pub screen_size: [f32; 2],
    /// Pixels per view-space unit at unit distance.
    pub focal_length_px: f32,
    /// Darkening applied at full occlusion.
    pub intensity: f32,
    /// Neighbourhood radius in view-space units.
    pub search_radius: f32,
    /// View-space extent of the sample disk. Fixed while `search_radius`
    /// varies, so a larger radius only adds and strengthens occluders.
    pub sample_reach: f32,
    /// Minimum depth lead before a neighbour counts as an occluder.
    pub bias: f32,
    /// Samples per pixel, already clamped to `1..=MAX_SAMPLES`.
    pub sample_count: u32,
    /// Per-pass jitter seed.
    pub seed: u32,
    /// Pads the block to its 16-byte alignment.
    pub _pad: [f32; 3],
}

/// Uniforms for one full-screen pass, tagged with the shader they feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassUniforms {
    /// Uniforms for [`Shader::FocalBlur`].
    FocalBlur(FocalBlurUniforms),
    /// Uniforms for [`Shader::ContactShadow`].
    ContactShadow(ContactShadowUniforms),
}

impl PassUniforms {
    /// The shader these uniforms belong to.
    #[must_use]
    pub const fn shader(&self) -> Shader {
        match self {
            Self::FocalBlur(_) => Shader::FocalBlur,
            Self::ContactShadow(_) => Shader::ContactShadow,
        }
    }

    /// Raw bytes for upload into a uniform buffer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::FocalBlur(u) => bytemuck::bytes_of(u),
            Self::ContactShadow(u) => bytemuck::bytes_of(u),
        }
    }
}

/// Clamp a requested sample count into the range the shaders support.
#[must_use]
pub fn clamp_samples(samples: u32) -> u32 {
    samples.clamp(1, MAX_SAMPLES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes_match_wgsl_layout() {
        assert_eq!(size_of::<FocalBlurUniforms>(), 32);
        assert_eq!(size_of::<ContactShadowUniforms>(), 112);
    }

    #[test]
    fn bytes_follow_variant() {
        let blur = PassUniforms::FocalBlur(bytemuck::Zeroable::zeroed());
        assert_eq!(blur.as_bytes().len(), 32);
        assert_eq!(blur.shader(), Shader::FocalBlur);
        let shadow = PassUniforms::ContactShadow(bytemuck::Zeroable::zeroed());
        assert_eq!(shadow.as_bytes().len(), 112);
        assert_eq!(shadow.shader(), Shader::ContactShadow);
    }

    #[test]
    fn sample_counts_are_clamped() {
        assert_eq!(clamp_samples(0), 1);
        assert_eq!(clamp_samples(15), 15);
        assert_eq!(clamp_samples(1000), MAX_SAMPLES);
    }
}
