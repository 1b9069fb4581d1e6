//! Off-screen color+depth render target.

use crate::error::{EffectError, InvalidState};
use crate::host::{AttachmentKind, Extent, Host, Output};

/// Versioned reference to one attachment of a [`RenderTarget`].
///
/// Handles are plain values; resolving one through
/// [`RenderTarget::texture`] after the target has been reallocated fails
/// with [`InvalidState::StaleAttachment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentHandle {
    /// Which attachment this refers to.
    pub kind: AttachmentKind,
    /// Dimensions of the attachment when the handle was issued.
    pub extent: Extent,
    /// Target generation the handle was issued for.
    pub generation: u64,
}

/// A color texture and a depth texture of matching size that drawing can be
/// redirected into.
///
/// Both attachments are always reallocated together: a failed resize keeps
/// the previous pair and generation, so a half-resized target is never
/// observable. Dropping the target releases both textures.
pub struct RenderTarget<H: Host> {
    extent: Extent,
    color: H::Texture,
    depth: H::Texture,
    generation: u64,
}

fn allocate_pair<H: Host>(
    host: &mut H,
    extent: Extent,
) -> Result<(H::Texture, H::Texture), EffectError> {
    if extent.is_empty() {
        return Err(EffectError::Allocation {
            extent,
            reason: "render target dimensions must be non-zero".to_owned(),
        });
    }
    let color = host.allocate(AttachmentKind::Color, extent)?;
    let depth = host.allocate(AttachmentKind::Depth, extent)?;
    Ok((color, depth))
}

impl<H: Host> RenderTarget<H> {
    /// Allocate a target of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::Allocation`] if either attachment cannot be
    /// created.
    pub fn new(host: &mut H, extent: Extent) -> Result<Self, EffectError> {
        let (color, depth) = allocate_pair(host, extent)?;
        log::debug!("render target allocated at {extent}");
        Ok(Self {
            extent,
            color,
            depth,
            generation: 1,
        })
    }

    /// Allocate a target sized to the host's current output.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::Allocation`] if either attachment cannot be
    /// created.
    pub fn for_output(host: &mut H) -> Result<Self, EffectError> {
        let extent = host.output_extent();
        Self::new(host, extent)
    }

    /// Reallocate both attachments if `extent` differs from the current size.
    ///
    /// Returns `true` when a reallocation happened. Safe to call every frame.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::Allocation`] if the new attachments cannot be
    /// created; the target then keeps its previous attachments.
    pub fn resize(
        &mut self,
        host: &mut H,
        extent: Extent,
    ) -> Result<bool, EffectError> {
        if extent == self.extent {
            return Ok(false);
        }
        let (color, depth) = allocate_pair(host, extent)?;
        self.color = color;
        self.depth = depth;
        log::debug!(
            "render target resized {} -> {extent} (generation {})",
            self.extent,
            self.generation + 1
        );
        self.extent = extent;
        self.generation += 1;
        Ok(true)
    }

    /// Redirect the host's output into this target for the duration of `f`.
    ///
    /// The previously active output is restored on every exit path: normal
    /// return, an `Err` from `f`, or a panic unwinding through it.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub fn with_output<R, E, F>(&self, host: &mut H, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut H) -> Result<R, E>,
    {
        let scope = OutputScope::bind(host, self.output());
        f(&mut *scope.host)
    }

    /// This target as a bindable output.
    #[must_use]
    pub fn output(&self) -> Output<H::Texture> {
        Output::Attachments {
            color: self.color.clone(),
            depth: self.depth.clone(),
        }
    }

    /// Handle to the color attachment at the current generation.
    #[must_use]
    pub fn color_texture(&self) -> AttachmentHandle {
        self.handle(AttachmentKind::Color)
    }

    /// Handle to the depth attachment at the current generation.
    #[must_use]
    pub fn depth_texture(&self) -> AttachmentHandle {
        self.handle(AttachmentKind::Depth)
    }

    /// Resolve a handle into the underlying texture.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidState::StaleAttachment`] if the handle predates the
    /// last reallocation.
    pub fn texture(
        &self,
        handle: AttachmentHandle,
    ) -> Result<&H::Texture, EffectError> {
        if handle.generation != self.generation {
            return Err(InvalidState::StaleAttachment {
                handle: handle.generation,
                current: self.generation,
            }
            .into());
        }
        Ok(match handle.kind {
            AttachmentKind::Color => &self.color,
            AttachmentKind::Depth => &self.depth,
        })
    }

    /// Current attachment dimensions.
    #[must_use]
    pub const fn extent(&self) -> Extent {
        self.extent
    }

    /// Reallocation counter; 1 after creation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    fn handle(&self, kind: AttachmentKind) -> AttachmentHandle {
        AttachmentHandle {
            kind,
            extent: self.extent,
            generation: self.generation,
        }
    }
}

/// Binds an output for its lifetime and restores the previous one on drop.
struct OutputScope<'a, H: Host> {
    host: &'a mut H,
    previous: Option<Output<H::Texture>>,
}

impl<'a, H: Host> OutputScope<'a, H> {
    fn bind(host: &'a mut H, output: Output<H::Texture>) -> Self {
        let previous = host.bind_output(output);
        Self {
            host,
            previous: Some(previous),
        }
    }
}

impl<H: Host> Drop for OutputScope<'_, H> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let _ = self.host.bind_output(previous);
        }
    }
}
