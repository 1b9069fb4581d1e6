//! Effect options with TOML preset support.
//!
//! Options serialize to/from TOML for presets stored in `assets/presets/`.
//! The JSON schema carries titles and ranges for building option panels.

mod contact_shadow;
mod focal_blur;

use std::path::Path;

pub use contact_shadow::ContactShadowOptions;
pub use focal_blur::FocalBlurOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EffectError;

/// How the per-pixel sample pattern is rotated between passes.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum JitterMode {
    /// Draw a fresh random seed for every pass.
    #[default]
    Animated,
    /// Reuse one seed so output is reproducible.
    Fixed {
        /// Seed fed to the per-pixel hash.
        seed: u32,
    },
}

impl JitterMode {
    /// Seed for the next pass.
    #[must_use]
    pub fn next_seed(self) -> u32 {
        match self {
            Self::Animated => rand::random(),
            Self::Fixed { seed } => seed,
        }
    }
}

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[contact_shadow]`) work.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct EffectOptions {
    /// Depth-of-field parameters.
    pub focal_blur: FocalBlurOptions,
    /// Contact shadow parameters.
    pub contact_shadow: ContactShadowOptions,
}

impl EffectOptions {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(EffectOptions)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::OptionsParse`] on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, EffectError> {
        toml::from_str(content)
            .map_err(|e| EffectError::OptionsParse(e.to_string()))
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::Io`] if the file cannot be read and
    /// [`EffectError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, EffectError> {
        let content = std::fs::read_to_string(path).map_err(EffectError::Io)?;
        let options = Self::from_toml(&content)?;
        log::info!("loaded effect options from {}", path.display());
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::OptionsParse`] if serialization fails and
    /// [`EffectError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), EffectError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EffectError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(EffectError::Io)?;
        }
        std::fs::write(path, content).map_err(EffectError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}
