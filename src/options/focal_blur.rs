use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::JitterMode;

/// Depth-of-field blur parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Focal Blur", inline)]
#[serde(default)]
pub struct FocalBlurOptions {
    /// Blur radius in pixels per view-space unit away from the focal plane.
    #[schemars(title = "Intensity", range(min = 0.0, max = 0.5), extend("step" = 0.005))]
    pub intensity: f32,
    /// Samples averaged per pixel.
    #[schemars(title = "Samples", range(min = 1, max = 64))]
    pub samples: u32,
    /// Sample pattern rotation between passes.
    #[schemars(skip)]
    pub jitter: JitterMode,
}

impl Default for FocalBlurOptions {
    fn default() -> Self {
        Self {
            intensity: 0.05,
            samples: 15,
            jitter: JitterMode::Animated,
        }
    }
}
