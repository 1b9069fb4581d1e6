//! Depth-of-field blur around a focal point captured during the draw.

use glam::{Vec3, Vec4Swizzles};

use super::effect_pass::{DrawScope, EffectPass, PassFrame, ShaderPass};
use super::uniforms::{clamp_samples, FocalBlurUniforms, PassUniforms, MAX_SAMPLES};
use crate::error::EffectError;
use crate::host::{Host, Shader};
use crate::options::{FocalBlurOptions, JitterMode};

/// Focal blur effect over host `H`.
pub type BlurEffect<H> = EffectPass<H, FocalBlur>;

/// Focal blur parameters and captured focal point.
///
/// Pixels at the focal point's view distance stay sharp; blur radius grows
/// by `intensity` pixels per unit of view distance away from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FocalBlur {
    focal_point: Vec3,
    intensity: f32,
    samples: u32,
    jitter: JitterMode,
}

impl Default for FocalBlur {
    fn default() -> Self {
        Self::new(&FocalBlurOptions::default())
    }
}

impl FocalBlur {
    /// Parameters from options; the focal point starts at the view origin.
    #[must_use]
    pub fn new(options: &FocalBlurOptions) -> Self {
        let mut blur = Self {
            focal_point: Vec3::ZERO,
            intensity: 0.0,
            samples: 1,
            jitter: JitterMode::Animated,
        };
        blur.apply_options(options);
        blur
    }

    /// Replace intensity, sample count and jitter from options.
    pub fn apply_options(&mut self, options: &FocalBlurOptions) {
        self.set_intensity(options.intensity);
        self.set_samples(options.samples);
        self.set_jitter(options.jitter);
    }

    /// Blur radius in pixels per unit of view distance from the focal
    /// plane. Zero disables the blur; negative values behave like zero.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    /// Samples averaged per pixel, clamped to `1..=MAX_SAMPLES`.
    pub fn set_samples(&mut self, samples: u32) {
        let clamped = clamp_samples(samples);
        if clamped != samples {
            log::warn!(
                "focal blur samples {samples} outside 1..={MAX_SAMPLES}, \
                 using {clamped}"
            );
        }
        self.samples = clamped;
    }

    /// How the sample pattern rotates between passes.
    pub fn set_jitter(&mut self, jitter: JitterMode) {
        self.jitter = jitter;
    }

    /// Set the focal point explicitly, in view space.
    pub fn focus_at(&mut self, view_point: Vec3) {
        self.focal_point = view_point;
    }

    /// Return the focal point to the view origin.
    pub fn reset_focus(&mut self) {
        self.focal_point = Vec3::ZERO;
    }

    /// Current focal point, in view space.
    #[must_use]
    pub const fn focal_point(&self) -> Vec3 {
        self.focal_point
    }

    /// Current intensity.
    #[must_use]
    pub const fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Current (clamped) sample count.
    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }
}

impl ShaderPass for FocalBlur {
    const SHADER: Shader = Shader::FocalBlur;

    fn uniforms(&mut self, frame: &PassFrame) -> PassUniforms {
        PassUniforms::FocalBlur(FocalBlurUniforms {
            screen_size: [frame.extent.width as f32, frame.extent.height as f32],
            near: frame.projection.znear,
            far: frame.projection.zfar,
            focus_distance: -self.focal_point.z,
            intensity: self.intensity,
            sample_count: self.samples,
            seed: self.jitter.next_seed(),
        })
    }
}

impl<H: Host> EffectPass<H, FocalBlur> {
    /// Create a focal blur with default parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ShaderCompile`] or [`EffectError::Allocation`]
    /// if the host cannot build the effect.
    pub fn new(host: &mut H) -> Result<Self, EffectError> {
        Self::with_options(host, &FocalBlurOptions::default())
    }

    /// Create a focal blur from options.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ShaderCompile`] or [`EffectError::Allocation`]
    /// if the host cannot build the effect.
    pub fn with_options(
        host: &mut H,
        options: &FocalBlurOptions,
    ) -> Result<Self, EffectError> {
        Self::with_pass(host, FocalBlur::new(options))
    }

    /// See [`FocalBlur::set_intensity`].
    pub fn set_intensity(&mut self, intensity: f32) {
        self.pass_mut().set_intensity(intensity);
    }

    /// See [`FocalBlur::set_samples`].
    pub fn set_samples(&mut self, samples: u32) {
        self.pass_mut().set_samples(samples);
    }
}

impl<H: Host> DrawScope<'_, H, FocalBlur> {
    /// Focus on the current model-view origin.
    ///
    /// Call from inside the draw callback after transforming to the object
    /// that should stay sharp. Later calls overwrite earlier ones.
    pub fn focus_here(&mut self) {
        let origin = self.model_view().w_axis.xyz();
        self.pass_mut().focus_at(origin);
    }
}
