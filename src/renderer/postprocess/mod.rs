//! Depth-aware post-processing effects.
//!
//! Each effect is an [`effect_pass::EffectPass`] specialised by a
//! [`effect_pass::ShaderPass`]: focal blur (depth of field around a focal
//! point captured during the draw) and contact shadow (occlusion from
//! nearby geometry in front of each pixel).

pub mod contact_shadow;
pub mod effect_pass;
pub mod focal_blur;
pub mod uniforms;
