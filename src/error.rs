//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;
use crate::host::{Extent, Shader};

/// Caller-contract violations detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidState {
    /// `draw` was entered while the same effect was already rendering.
    ReentrantDraw,
    /// An attachment handle was resolved after its target was reallocated.
    StaleAttachment {
        /// Generation the handle was issued for.
        handle: u64,
        /// Current generation of the render target.
        current: u64,
    },
    /// A GPU operation was issued outside `begin_frame` / `end_frame`.
    NoActiveFrame,
    /// Uniforms were supplied for a different shader than the program.
    ProgramMismatch {
        /// Shader the program was compiled from.
        program: Shader,
        /// Shader the uniforms belong to.
        uniforms: Shader,
    },
}

impl fmt::Display for InvalidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReentrantDraw => {
                write!(f, "draw called while the effect is already rendering")
            }
            Self::StaleAttachment { handle, current } => write!(
                f,
                "attachment handle from generation {handle} used after \
                 reallocation (current generation {current})"
            ),
            Self::NoActiveFrame => write!(f, "no frame is being recorded"),
            Self::ProgramMismatch { program, uniforms } => write!(
                f,
                "uniforms for {} passed to the {} program",
                uniforms.label(),
                program.label()
            ),
        }
    }
}

/// Errors produced by the depthfx crate.
#[derive(Debug)]
pub enum EffectError {
    /// Texture or framebuffer creation failed.
    Allocation {
        /// Requested attachment dimensions.
        extent: Extent,
        /// Host-reported cause.
        reason: String,
    },
    /// A full-screen shader failed to compose, validate, or link.
    ShaderCompile {
        /// The shader that failed.
        shader: Shader,
        /// Compiler diagnostic.
        message: String,
    },
    /// The caller broke an effect or render-target contract.
    InvalidState(InvalidState),
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { extent, reason } => {
                write!(f, "failed to allocate {extent} attachment: {reason}")
            }
            Self::ShaderCompile { shader, message } => {
                write!(f, "failed to compile {} shader: {message}", shader.label())
            }
            Self::InvalidState(state) => write!(f, "invalid state: {state}"),
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for EffectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InvalidState> for EffectError {
    fn from(state: InvalidState) -> Self {
        Self::InvalidState(state)
    }
}

impl From<RenderContextError> for EffectError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for EffectError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
