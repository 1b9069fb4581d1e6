use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::JitterMode;

/// Contact shadow parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Contact Shadow", inline)]
#[serde(default)]
pub struct ContactShadowOptions {
    /// Darkening at full occlusion.
    #[schemars(title = "Intensity", range(min = 0.0, max = 1.5), extend("step" = 0.05))]
    pub intensity: f32,
    /// Neighbourhood samples per pixel.
    #[schemars(title = "Samples", range(min = 1, max = 64))]
    pub samples: u32,
    /// Neighbourhood radius in world units.
    #[schemars(title = "Search Radius", range(min = 0.0, max = 500.0), extend("step" = 5.0))]
    pub search_radius: f32,
    /// World-space extent of the sampled neighbourhood.
    #[schemars(title = "Sample Reach", range(min = 1.0, max = 500.0), extend("step" = 5.0))]
    pub sample_reach: f32,
    /// Minimum depth lead, in world units, before a neighbour occludes.
    #[schemars(skip)]
    pub bias: f32,
    /// Sample pattern rotation between passes.
    #[schemars(skip)]
    pub jitter: JitterMode,
}

impl Default for ContactShadowOptions {
    fn default() -> Self {
        Self {
            intensity: 0.5,
            samples: 15,
            search_radius: 100.0,
            sample_reach: 100.0,
            bias: 0.05,
            jitter: JitterMode::Animated,
        }
    }
}
