//! The draw-redirect-composite cycle shared by every depth effect.
//!
//! An [`EffectPass`] owns a [`RenderTarget`] and one compiled full-screen
//! program. [`EffectPass::draw`] brings the target up to the host's output
//! size, redirects drawing into it for the duration of a callback, then
//! runs the program over the restored output with the target's color and
//! depth as inputs. What the program computes is supplied by a
//! [`ShaderPass`].

use std::ops::{Deref, DerefMut};

use crate::camera::projection::Projection;
use crate::error::{EffectError, InvalidState};
use crate::host::{Extent, Host, PassInputs, Shader};
use crate::renderer::postprocess::uniforms::PassUniforms;
use crate::renderer::render_target::RenderTarget;

/// Per-pass snapshot handed to [`ShaderPass::uniforms`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassFrame {
    /// Host projection at composite time.
    pub projection: Projection,
    /// Dimensions of the attachments being sampled.
    pub extent: Extent,
}

/// Effect-specific half of an [`EffectPass`]: which shader to run and the
/// uniforms to feed it.
pub trait ShaderPass {
    /// Full-screen program this pass composites with.
    const SHADER: Shader;

    /// Build the uniform block for one composite.
    ///
    /// Called once per [`EffectPass::draw`], after the scene callback.
    fn uniforms(&mut self, frame: &PassFrame) -> PassUniforms;
}

/// Lifecycle of an [`EffectPass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    /// Idle; `draw` may be called.
    Ready,
    /// Inside the scene callback.
    Rendering,
}

/// Holds an effect in [`EffectState::Rendering`] and returns it to
/// [`EffectState::Ready`] when dropped, including during unwinding.
struct RenderingScope<'a> {
    state: &'a mut EffectState,
}

impl<'a> RenderingScope<'a> {
    fn enter(state: &'a mut EffectState) -> Self {
        *state = EffectState::Rendering;
        Self { state }
    }
}

impl Drop for RenderingScope<'_> {
    fn drop(&mut self) {
        *self.state = EffectState::Ready;
    }
}

/// View of the host handed to the scene callback.
///
/// Dereferences to the host, so scene code draws through it as usual;
/// drawing lands in the effect's render target. Effect-specific hooks such
/// as `focus_here` are inherent methods on the concrete scope type.
pub struct DrawScope<'a, H, P> {
    host: &'a mut H,
    pass: &'a mut P,
}

impl<H, P> DrawScope<'_, H, P> {
    /// The host, drawing into the effect's render target.
    pub fn host(&mut self) -> &mut H {
        self.host
    }

    /// The effect's parameters.
    #[must_use]
    pub fn pass(&self) -> &P {
        self.pass
    }

    /// Mutable access to the effect's parameters.
    pub fn pass_mut(&mut self) -> &mut P {
        self.pass
    }
}

impl<H, P> Deref for DrawScope<'_, H, P> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H, P> DerefMut for DrawScope<'_, H, P> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

/// A render target, a compiled program and the parameters that drive it.
pub struct EffectPass<H: Host, P: ShaderPass> {
    target: RenderTarget<H>,
    program: H::Program,
    pass: P,
    state: EffectState,
}

impl<H: Host, P: ShaderPass> EffectPass<H, P> {
    /// Compile `P::SHADER` and allocate a render target sized to the host
    /// output.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::ShaderCompile`] if the program does not build
    /// and [`EffectError::Allocation`] if the target cannot be created.
    pub fn with_pass(host: &mut H, pass: P) -> Result<Self, EffectError> {
        let program = host.compile(P::SHADER)?;
        let target = RenderTarget::for_output(host)?;
        log::info!(
            "{} effect ready at {}",
            P::SHADER.label(),
            target.extent()
        );
        Ok(Self {
            target,
            program,
            pass,
            state: EffectState::Ready,
        })
    }

    /// Draw the scene through this effect.
    ///
    /// 1. The render target is resized to the host output if needed.
    /// 2. The target is bound and cleared and `callback` draws into it.
    /// 3. The previous output is restored.
    /// 4. The effect's program composites the target onto that output.
    ///
    /// The output is restored and the effect returns to
    /// [`EffectState::Ready`] even when `callback` fails or panics; a
    /// failure's error is returned and nothing is composited.
    ///
    /// # Errors
    ///
    /// - [`InvalidState::ReentrantDraw`] if the effect is already rendering.
    /// - [`EffectError::Allocation`] if the target cannot be resized.
    /// - Any error returned by `callback`.
    /// - Host errors from the composite.
    pub fn draw<F, E>(&mut self, host: &mut H, callback: F) -> Result<(), E>
    where
        F: FnOnce(&mut DrawScope<'_, H, P>) -> Result<(), E>,
        E: From<EffectError>,
    {
        if self.state == EffectState::Rendering {
            return Err(EffectError::from(InvalidState::ReentrantDraw).into());
        }

        let Self {
            target,
            program,
            pass,
            state,
        } = self;

        let extent = host.output_extent();
        if !extent.is_empty() {
            let _ = target.resize(host, extent)?;
        }

        let rendering = RenderingScope::enter(state);
        let drawn = target.with_output(host, |h| {
            h.clear_output()?;
            callback(&mut DrawScope { host: h, pass })
        });
        drop(rendering);
        drawn?;

        let frame = PassFrame {
            projection: host.projection(),
            extent: target.extent(),
        };
        let uniforms = pass.uniforms(&frame);
        log::debug!("compositing {} at {}", P::SHADER.label(), frame.extent);
        let color = target.texture(target.color_texture())?;
        let depth = target.texture(target.depth_texture())?;
        host.fullscreen_pass(program, PassInputs { color, depth }, &uniforms)?;
        Ok(())
    }

    /// The effect's render target.
    #[must_use]
    pub fn target(&self) -> &RenderTarget<H> {
        &self.target
    }

    /// The effect's parameters.
    #[must_use]
    pub fn pass(&self) -> &P {
        &self.pass
    }

    /// Mutable access to the effect's parameters.
    pub fn pass_mut(&mut self) -> &mut P {
        &mut self.pass
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EffectState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::host::software::SoftwareHost;
    use crate::renderer::postprocess::uniforms::FocalBlurUniforms;

    /// Pass-through blur: zero intensity never moves a texel.
    struct Identity {
        composites: usize,
    }

    impl ShaderPass for Identity {
        const SHADER: Shader = Shader::FocalBlur;

        fn uniforms(&mut self, frame: &PassFrame) -> PassUniforms {
            self.composites += 1;
            PassUniforms::FocalBlur(FocalBlurUniforms {
                screen_size: [
                    frame.extent.width as f32,
                    frame.extent.height as f32,
                ],
                near: frame.projection.znear,
                far: frame.projection.zfar,
                focus_distance: 0.0,
                intensity: 0.0,
                sample_count: 1,
                seed: 0,
            })
        }
    }

    fn setup() -> (SoftwareHost, EffectPass<SoftwareHost, Identity>) {
        let mut host = SoftwareHost::new(Extent::new(32, 24));
        let effect =
            EffectPass::with_pass(&mut host, Identity { composites: 0 })
                .unwrap();
        (host, effect)
    }

    #[test]
    fn scene_reaches_screen_through_target() {
        let (mut host, mut effect) = setup();
        effect
            .draw(&mut host, |scope| -> Result<(), EffectError> {
                assert!(!scope.active_output().is_screen());
                scope.translate(Vec3::new(0.0, 0.0, -50.0));
                scope.draw_sphere(10.0, Vec4::ONE);
                Ok(())
            })
            .unwrap();
        assert!(host.active_output().is_screen());
        assert!(host.screen_pixel(16, 12).x > 0.0);
        assert_eq!(host.screen_pixel(0, 0), Vec4::ZERO);
        assert_eq!(effect.pass().composites, 1);
        assert_eq!(effect.state(), EffectState::Ready);
    }

    #[test]
    fn target_is_cleared_between_draws() {
        let (mut host, mut effect) = setup();
        effect
            .draw(&mut host, |scope| -> Result<(), EffectError> {
                scope.clear(Vec4::ONE);
                Ok(())
            })
            .unwrap();
        effect
            .draw(&mut host, |_| -> Result<(), EffectError> { Ok(()) })
            .unwrap();
        assert_eq!(host.screen_pixel(5, 5), Vec4::ZERO);
    }

    #[test]
    fn callback_error_skips_composite_and_restores_output() {
        let (mut host, mut effect) = setup();
        let err = effect
            .draw(&mut host, |_| -> Result<(), EffectError> {
                Err(InvalidState::NoActiveFrame.into())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            EffectError::InvalidState(InvalidState::NoActiveFrame)
        ));
        assert!(host.active_output().is_screen());
        assert_eq!(effect.pass().composites, 0);
        assert_eq!(effect.state(), EffectState::Ready);
    }

    #[test]
    fn target_follows_output_size() {
        let (mut host, mut effect) = setup();
        assert_eq!(effect.target().generation(), 1);
        host.resize_output(Extent::new(40, 30));
        effect
            .draw(&mut host, |_| -> Result<(), EffectError> { Ok(()) })
            .unwrap();
        assert_eq!(effect.target().extent(), Extent::new(40, 30));
        assert_eq!(effect.target().generation(), 2);
        effect
            .draw(&mut host, |_| -> Result<(), EffectError> { Ok(()) })
            .unwrap();
        assert_eq!(effect.target().generation(), 2);
    }

    #[test]
    fn empty_output_keeps_previous_target() {
        let (mut host, mut effect) = setup();
        host.resize_output(Extent::new(0, 0));
        effect
            .draw(&mut host, |_| -> Result<(), EffectError> { Ok(()) })
            .unwrap();
        assert_eq!(effect.target().extent(), Extent::new(32, 24));
    }

    #[test]
    fn failed_resize_is_reported() {
        let mut host =
            SoftwareHost::new(Extent::new(16, 16)).with_texel_budget(3 * 256);
        let mut effect =
            EffectPass::with_pass(&mut host, Identity { composites: 0 })
                .unwrap();
        host.resize_output(Extent::new(64, 64));
        let err = effect
            .draw(&mut host, |_| -> Result<(), EffectError> { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, EffectError::Allocation { .. }));
        assert_eq!(effect.target().generation(), 1);
        assert_eq!(effect.state(), EffectState::Ready);
    }

    #[test]
    fn panicking_callback_leaves_the_effect_ready() {
        let (mut host, mut effect) = setup();
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _ = effect.draw(
                    &mut host,
                    |_| -> Result<(), EffectError> { panic!("scene bug") },
                );
            }));
        assert!(outcome.is_err());
        assert!(host.active_output().is_screen());
        assert_eq!(effect.state(), EffectState::Ready);
        assert_eq!(effect.pass().composites, 0);
        effect
            .draw(&mut host, |scope| -> Result<(), EffectError> {
                scope.translate(Vec3::new(0.0, 0.0, -50.0));
                scope.draw_sphere(10.0, Vec4::ONE);
                Ok(())
            })
            .unwrap();
        assert_eq!(effect.pass().composites, 1);
        assert!(host.screen_pixel(16, 12).x > 0.0);
    }

    #[test]
    fn rendering_scope_resets_state_on_every_exit() {
        let mut state = EffectState::Ready;
        let scope = RenderingScope::enter(&mut state);
        assert_eq!(*scope.state, EffectState::Rendering);
        drop(scope);
        assert_eq!(state, EffectState::Ready);

        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _scope = RenderingScope::enter(&mut state);
                panic!("unwinding");
            }));
        assert!(outcome.is_err());
        assert_eq!(state, EffectState::Ready);
    }

    #[test]
    fn custom_error_types_propagate() {
        #[derive(Debug)]
        enum SceneError {
            Effect(EffectError),
            MissingMesh,
        }
        impl From<EffectError> for SceneError {
            fn from(e: EffectError) -> Self {
                Self::Effect(e)
            }
        }

        let (mut host, mut effect) = setup();
        let err = effect
            .draw(&mut host, |_| Err(SceneError::MissingMesh))
            .unwrap_err();
        assert!(matches!(err, SceneError::MissingMesh));
        let SceneError::Effect(inner) =
            SceneError::from(EffectError::OptionsParse(String::new()))
        else {
            panic!("expected wrapped effect error");
        };
        assert!(matches!(inner, EffectError::OptionsParse(_)));
    }
}
