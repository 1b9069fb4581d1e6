use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
    ShaderType,
};

use crate::error::EffectError;
use crate::host::Shader;

/// Shared module definition.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
    import_path: &'static str,
}

/// Shared modules in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
        import_path: "depthfx::fullscreen",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/depth.wgsl"),
        file_path: "modules/depth.wgsl",
        import_path: "depthfx::depth",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/sampling.wgsl"),
        file_path: "modules/sampling.wgsl",
        import_path: "depthfx::sampling",
    },
];

/// WGSL source and file path of a full-screen shader.
const fn shader_source(shader: Shader) -> (&'static str, &'static str) {
    match shader {
        Shader::FocalBlur => (
            include_str!("../../assets/shaders/screen/focal_blur.wgsl"),
            "screen/focal_blur.wgsl",
        ),
        Shader::ContactShadow => (
            include_str!("../../assets/shaders/screen/contact_shadow.wgsl"),
            "screen/contact_shadow.wgsl",
        ),
    }
}

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Effect shaders use `#import depthfx::module_name` to pull in shared
/// code. Shared modules are registered on first use; the composer produces
/// `naga::Module` IR directly, skipping a WGSL re-parse at runtime.
#[derive(Default)]
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Create an empty composer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register_modules(&mut self, shader: Shader) -> Result<(), EffectError> {
        for m in MODULES {
            if self.composer.contains_module(m.import_path) {
                continue;
            }
            let added = self
                .composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map(|_| ());
            if let Err(e) = added {
                return Err(EffectError::ShaderCompile {
                    shader,
                    message: format!(
                        "module {}: {}",
                        m.file_path,
                        e.emit_to_string(&self.composer)
                    ),
                });
            }
        }
        Ok(())
    }

    fn make_module(
        &mut self,
        shader: Shader,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, EffectError> {
        self.register_modules(shader)?;
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| EffectError::ShaderCompile {
                shader,
                message: e.emit_to_string(&self.composer),
            })
    }

    /// Compose a shader into a `naga::Module` without creating a wgpu
    /// shader module. Useful for validating shaders without a GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ShaderCompile`] if composition or validation
    /// fails.
    pub fn compose_naga(
        &mut self,
        shader: Shader,
    ) -> Result<naga::Module, EffectError> {
        let (source, file_path) = shader_source(shader);
        self.make_module(shader, source, file_path)
    }

    /// Compose a shader into a `wgpu::ShaderModule` ready for pipeline
    /// creation.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ShaderCompile`] if composition fails or the
    /// device rejects the module.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
    ) -> Result<wgpu::ShaderModule, EffectError> {
        let naga_module = self.compose_naga(shader)?;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        });
        match pollster::block_on(device.pop_error_scope()) {
            Some(e) => Err(EffectError::ShaderCompile {
                shader,
                message: e.to_string(),
            }),
            None => Ok(module),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_shaders_compose() {
        let mut composer = ShaderComposer::new();
        for shader in Shader::ALL {
            let _ = composer.compose_naga(shader).unwrap_or_else(|e| {
                panic!("{} failed to compose: {e}", shader.label())
            });
        }
    }

    #[test]
    fn uniform_blocks_match_rust_layout() {
        let mut composer = ShaderComposer::new();
        for shader in Shader::ALL {
            let module = composer.compose_naga(shader).unwrap();
            let mut layouter = naga::proc::Layouter::default();
            layouter.update(module.to_ctx()).unwrap();
            let (_, params) = module
                .global_variables
                .iter()
                .find(|(_, var)| var.name.as_deref() == Some("params"))
                .unwrap();
            assert_eq!(
                layouter[params.ty].size as usize,
                shader.uniform_size(),
                "{}",
                shader.label()
            );
        }
    }

    #[test]
    fn entry_points_are_exported() {
        let mut composer = ShaderComposer::new();
        for shader in Shader::ALL {
            let module = composer.compose_naga(shader).unwrap();
            let names: Vec<_> =
                module.entry_points.iter().map(|e| e.name.as_str()).collect();
            assert!(names.contains(&"vs_main"), "{}", shader.label());
            assert!(names.contains(&"fs_main"), "{}", shader.label());
        }
    }

    #[test]
    fn broken_source_reports_shader() {
        let mut composer = ShaderComposer::new();
        let err = composer
            .make_module(
                Shader::ContactShadow,
                "#import depthfx::depth::{linearize_depth}\nfn broken( {",
                "broken.wgsl",
            )
            .unwrap_err();
        match err {
            EffectError::ShaderCompile { shader, message } => {
                assert_eq!(shader, Shader::ContactShadow);
                assert!(!message.is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }
}
