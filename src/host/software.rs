//! Headless CPU host.
//!
//! Textures are shared texel planes; full-screen passes run through the
//! kernels in [`crate::shading`]. Besides serving as a reference for the
//! GPU path, the host carries a tiny rasterizer (depth-tested spheres and
//! camera-facing billboards) so scenes can be drawn into it without a
//! graphics device.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use super::{AttachmentKind, Extent, Host, Output, PassInputs, Shader};
use crate::camera::projection::Projection;
use crate::camera::transform::TransformStack;
use crate::error::{EffectError, InvalidState};
use crate::renderer::postprocess::uniforms::PassUniforms;
use crate::shading::{self, ImageView};

/// Largest width or height a software attachment may have.
pub const MAX_DIMENSION: u32 = 8192;

/// Direction light arrives from, in view space.
const LIGHT_DIR: Vec3 = Vec3::new(0.3, 0.5, 1.0);
const AMBIENT: f32 = 0.2;

#[derive(Debug)]
struct Plane {
    extent: Extent,
    kind: AttachmentKind,
    texels: Vec<Vec4>,
}

impl Plane {
    fn new(kind: AttachmentKind, extent: Extent) -> Self {
        let fill = match kind {
            AttachmentKind::Color => Vec4::ZERO,
            AttachmentKind::Depth => Vec4::X,
        };
        Self {
            extent,
            kind,
            texels: vec![fill; extent.texel_count()],
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.extent.width && y < self.extent.height)
            .then(|| y as usize * self.extent.width as usize + x as usize)
    }

    fn view(&self) -> Option<ImageView<'_>> {
        ImageView::new(self.extent, &self.texels)
    }
}

/// Shared handle to a software texel plane.
///
/// Clones alias the same storage; equality is identity.
#[derive(Debug, Clone)]
pub struct SoftTexture(Rc<RefCell<Plane>>);

impl PartialEq for SoftTexture {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl SoftTexture {
    fn new(kind: AttachmentKind, extent: Extent) -> Self {
        Self(Rc::new(RefCell::new(Plane::new(kind, extent))))
    }

    fn plane(&self) -> Ref<'_, Plane> {
        self.0.borrow()
    }
}

/// A "compiled" software program: the kernel to dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftProgram {
    shader: Shader,
}

impl SoftProgram {
    /// The shader this program runs.
    #[must_use]
    pub const fn shader(&self) -> Shader {
        self.shader
    }
}

/// CPU implementation of [`Host`].
#[derive(Debug)]
pub struct SoftwareHost {
    screen_color: SoftTexture,
    screen_depth: SoftTexture,
    active: Output<SoftTexture>,
    projection: Projection,
    transforms: TransformStack,
    texel_budget: Option<usize>,
    live: Vec<Weak<RefCell<Plane>>>,
}

impl SoftwareHost {
    /// Create a host whose screen is `extent` pixels, cleared to transparent
    /// black at far depth.
    #[must_use]
    pub fn new(extent: Extent) -> Self {
        let projection = Projection {
            aspect: extent.aspect(),
            ..Projection::default()
        };
        Self {
            screen_color: SoftTexture::new(AttachmentKind::Color, extent),
            screen_depth: SoftTexture::new(AttachmentKind::Depth, extent),
            active: Output::Screen,
            projection,
            transforms: TransformStack::default(),
            texel_budget: None,
            live: Vec::new(),
        }
    }

    /// Cap the total texels held by live attachments. Allocations past the
    /// cap fail with [`EffectError::Allocation`].
    #[must_use]
    pub fn with_texel_budget(mut self, texels: usize) -> Self {
        self.texel_budget = Some(texels);
        self
    }

    /// Reallocate the screen planes, e.g. after a window resize.
    ///
    /// The projection's aspect ratio follows the new size.
    pub fn resize_output(&mut self, extent: Extent) {
        self.screen_color = SoftTexture::new(AttachmentKind::Color, extent);
        self.screen_depth = SoftTexture::new(AttachmentKind::Depth, extent);
        self.projection.aspect = extent.aspect();
    }

    /// Replace the projection scenes are drawn with.
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    /// The model-view stack.
    pub fn transforms_mut(&mut self) -> &mut TransformStack {
        &mut self.transforms
    }

    /// Save the current model transform.
    pub fn push_matrix(&mut self) {
        self.transforms.push();
    }

    /// Restore the last saved model transform.
    pub fn pop_matrix(&mut self) {
        let _ = self.transforms.pop();
    }

    /// Post-multiply a translation onto the model transform.
    pub fn translate(&mut self, offset: Vec3) {
        self.transforms.translate(offset);
    }

    /// Post-multiply a rotation onto the model transform.
    pub fn rotate(&mut self, rotation: Quat) {
        self.transforms.rotate(rotation);
    }

    /// Number of attachments still referenced anywhere.
    pub fn live_textures(&mut self) -> usize {
        self.live.retain(|w| w.strong_count() > 0);
        self.live.len()
    }

    /// Fill the active output with `color` and reset its depth to the far
    /// plane.
    pub fn clear(&mut self, color: Vec4) {
        let (color_plane, depth_plane) = self.active_planes();
        color_plane.0.borrow_mut().texels.fill(color);
        depth_plane.0.borrow_mut().texels.fill(Vec4::X);
    }

    /// Overwrite every color texel of the active output with `shade(x, y)`,
    /// leaving depth untouched, like an upload into the color attachment.
    pub fn paint<F>(&mut self, shade: F)
    where
        F: Fn(u32, u32) -> Vec4,
    {
        let (color_plane, _) = self.active_planes();
        let mut plane = color_plane.0.borrow_mut();
        let width = plane.extent.width as usize;
        for (i, texel) in plane.texels.iter_mut().enumerate() {
            *texel = shade((i % width) as u32, (i / width) as u32);
        }
    }

    /// Depth-tested write of one fragment into the active output.
    ///
    /// Returns `true` if the fragment passed the depth test.
    pub fn plot(&mut self, x: u32, y: u32, depth: f32, color: Vec4) -> bool {
        let (color_plane, depth_plane) = self.active_planes();
        let mut depths = depth_plane.0.borrow_mut();
        let Some(i) = depths.index(x, y) else {
            return false;
        };
        if depth.is_nan() || depth >= depths.texels[i].x {
            return false;
        }
        let mut colors = color_plane.0.borrow_mut();
        let Some(j) = colors.index(x, y) else {
            return false;
        };
        depths.texels[i].x = depth;
        colors.texels[j] = color;
        true
    }

    /// Raycast a Lambert-shaded sphere centred at the current model-view
    /// origin.
    pub fn draw_sphere(&mut self, radius: f32, color: Vec4) {
        let center = self.model_view().w_axis.truncate();
        let light = LIGHT_DIR.normalize();
        self.raster(|dir| {
            let along = dir.dot(center);
            let disc = along * along - center.length_squared() + radius * radius;
            if disc < 0.0 {
                return None;
            }
            let hit = dir * (along - disc.sqrt());
            let normal = (hit - center) / radius;
            let lambert = AMBIENT + (1.0 - AMBIENT) * normal.dot(light).max(0.0);
            Some((-hit.z, (color.truncate() * lambert).extend(color.w)))
        });
    }

    /// Draw a camera-facing rectangle centred at the current model-view
    /// origin, spanning `half` units either side.
    ///
    /// `shade` receives local coordinates in `[-1, 1]²` (y up).
    pub fn draw_billboard<F>(&mut self, half: Vec2, shade: F)
    where
        F: Fn(Vec2) -> Vec4,
    {
        let center = self.model_view().w_axis.truncate();
        if center.z >= 0.0 || half.min_element() <= 0.0 {
            return;
        }
        self.raster(|dir| {
            if dir.z >= 0.0 {
                return None;
            }
            let hit = dir * (center.z / dir.z);
            let local = (hit.truncate() - center.truncate()) / half;
            (local.abs().max_element() <= 1.0)
                .then(|| (-center.z, shade(local)))
        });
    }

    /// Screen color at `(x, y)`; transparent black outside the screen.
    #[must_use]
    pub fn screen_pixel(&self, x: u32, y: u32) -> Vec4 {
        self.texel(&self.screen_color, x, y)
    }

    /// Linear view distance stored in the screen depth plane at `(x, y)`.
    #[must_use]
    pub fn screen_distance(&self, x: u32, y: u32) -> f32 {
        self.projection.linearize(self.texel(&self.screen_depth, x, y).x)
    }

    /// Copy of every screen color texel, row-major.
    #[must_use]
    pub fn screen_texels(&self) -> Vec<Vec4> {
        self.texture_texels(&self.screen_color)
    }

    /// Texel of an attachment; transparent black outside its bounds.
    #[must_use]
    pub fn texel(&self, texture: &SoftTexture, x: u32, y: u32) -> Vec4 {
        let plane = texture.plane();
        plane.index(x, y).map_or(Vec4::ZERO, |i| plane.texels[i])
    }

    /// Copy of every texel of an attachment, row-major.
    #[must_use]
    pub fn texture_texels(&self, texture: &SoftTexture) -> Vec<Vec4> {
        texture.plane().texels.clone()
    }

    fn active_planes(&self) -> (SoftTexture, SoftTexture) {
        match &self.active {
            Output::Screen => {
                (self.screen_color.clone(), self.screen_depth.clone())
            }
            Output::Attachments { color, depth } => {
                (color.clone(), depth.clone())
            }
        }
    }

    /// Cast a ray through every pixel of the active output. `hit` returns
    /// the view distance and color of the surface along the ray, if any.
    fn raster<F>(&mut self, hit: F)
    where
        F: Fn(Vec3) -> Option<(f32, Vec4)>,
    {
        let extent = self.active_planes().0.plane().extent;
        let (w, h) = (extent.width as f32, extent.height as f32);
        let inverse = self.projection.matrix().inverse();
        for y in 0..extent.height {
            for x in 0..extent.width {
                let through = Projection::unproject(
                    &inverse,
                    x as f32 + 0.5,
                    y as f32 + 0.5,
                    0.5,
                    w,
                    h,
                );
                let Some((distance, color)) = hit(through.normalize()) else {
                    continue;
                };
                if distance <= self.projection.znear
                    || distance >= self.projection.zfar
                {
                    continue;
                }
                let depth = self.projection.ndc_depth(distance);
                let _ = self.plot(x, y, depth, color);
            }
        }
    }

    fn live_texels(&mut self) -> usize {
        self.live.retain(|w| w.strong_count() > 0);
        self.live
            .iter()
            .filter_map(Weak::upgrade)
            .map(|p| p.borrow().extent.texel_count())
            .sum()
    }
}

impl Host for SoftwareHost {
    type Texture = SoftTexture;
    type Program = SoftProgram;

    fn output_extent(&self) -> Extent {
        self.screen_color.plane().extent
    }

    fn projection(&self) -> Projection {
        self.projection
    }

    fn model_view(&self) -> Mat4 {
        self.transforms.current()
    }

    fn allocate(
        &mut self,
        kind: AttachmentKind,
        extent: Extent,
    ) -> Result<SoftTexture, EffectError> {
        if extent.is_empty() {
            return Err(EffectError::Allocation {
                extent,
                reason: "zero-sized attachment".to_owned(),
            });
        }
        if extent.width > MAX_DIMENSION || extent.height > MAX_DIMENSION {
            return Err(EffectError::Allocation {
                extent,
                reason: format!("exceeds maximum dimension {MAX_DIMENSION}"),
            });
        }
        if let Some(budget) = self.texel_budget {
            let in_use = self.live_texels();
            if in_use + extent.texel_count() > budget {
                return Err(EffectError::Allocation {
                    extent,
                    reason: format!(
                        "texel budget exhausted ({in_use} of {budget} in use)"
                    ),
                });
            }
        }
        let texture = SoftTexture::new(kind, extent);
        self.live.push(Rc::downgrade(&texture.0));
        Ok(texture)
    }

    fn texture_extent(&self, texture: &SoftTexture) -> Extent {
        texture.plane().extent
    }

    fn active_output(&self) -> &Output<SoftTexture> {
        &self.active
    }

    fn bind_output(&mut self, output: Output<SoftTexture>) -> Output<SoftTexture> {
        std::mem::replace(&mut self.active, output)
    }

    fn clear_output(&mut self) -> Result<(), EffectError> {
        self.clear(Vec4::ZERO);
        Ok(())
    }

    fn compile(&mut self, shader: Shader) -> Result<SoftProgram, EffectError> {
        log::debug!("software program ready: {}", shader.label());
        Ok(SoftProgram { shader })
    }

    fn fullscreen_pass(
        &mut self,
        program: &SoftProgram,
        inputs: PassInputs<'_, SoftTexture>,
        uniforms: &PassUniforms,
    ) -> Result<(), EffectError> {
        if program.shader != uniforms.shader() {
            return Err(InvalidState::ProgramMismatch {
                program: program.shader,
                uniforms: uniforms.shader(),
            }
            .into());
        }

        let (rendered, source_extent) = {
            let color = inputs.color.plane();
            let depth = inputs.depth.plane();
            debug_assert_eq!(color.kind, AttachmentKind::Color);
            debug_assert_eq!(depth.kind, AttachmentKind::Depth);
            let (Some(cv), Some(dv)) = (color.view(), depth.view()) else {
                return Ok(());
            };
            let rendered = match uniforms {
                PassUniforms::FocalBlur(u) => {
                    shading::focal_blur::render(&cv, &dv, u)
                }
                PassUniforms::ContactShadow(u) => {
                    shading::contact_shadow::render(&cv, &dv, u)
                }
            };
            (rendered, color.extent)
        };

        let (target, _) = self.active_planes();
        let mut out = target.0.borrow_mut();
        let region = out.extent.min(source_extent);
        for y in 0..region.height {
            let src = y as usize * source_extent.width as usize;
            let dst = y as usize * out.extent.width as usize;
            let n = region.width as usize;
            out.texels[dst..dst + n].copy_from_slice(&rendered[src..src + n]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::projection::is_background;
    use crate::renderer::postprocess::uniforms::{
        ContactShadowUniforms, FocalBlurUniforms,
    };

    #[test]
    fn allocations_start_cleared() {
        let mut host = SoftwareHost::new(Extent::new(4, 4));
        let color = host.allocate(AttachmentKind::Color, Extent::new(3, 2)).unwrap();
        let depth = host.allocate(AttachmentKind::Depth, Extent::new(3, 2)).unwrap();
        assert_eq!(host.texture_extent(&color), Extent::new(3, 2));
        assert_eq!(host.texel(&color, 2, 1), Vec4::ZERO);
        assert_eq!(host.texel(&depth, 2, 1).x, 1.0);
        assert_eq!(host.live_textures(), 2);
    }

    #[test]
    fn oversized_and_over_budget_allocations_fail() {
        let mut host = SoftwareHost::new(Extent::new(4, 4)).with_texel_budget(100);
        assert!(matches!(
            host.allocate(AttachmentKind::Color, Extent::new(MAX_DIMENSION + 1, 1)),
            Err(EffectError::Allocation { .. })
        ));
        let kept = host.allocate(AttachmentKind::Color, Extent::new(8, 8)).unwrap();
        assert!(matches!(
            host.allocate(AttachmentKind::Depth, Extent::new(8, 8)),
            Err(EffectError::Allocation { .. })
        ));
        drop(kept);
        assert!(host.allocate(AttachmentKind::Depth, Extent::new(8, 8)).is_ok());
    }

    #[test]
    fn bind_output_swaps() {
        let mut host = SoftwareHost::new(Extent::new(4, 4));
        let color = host.allocate(AttachmentKind::Color, Extent::new(4, 4)).unwrap();
        let depth = host.allocate(AttachmentKind::Depth, Extent::new(4, 4)).unwrap();
        let target = Output::Attachments { color, depth };
        let previous = host.bind_output(target.clone());
        assert!(previous.is_screen());
        assert_eq!(*host.active_output(), target);
        assert_eq!(host.bind_output(previous), target);
    }

    #[test]
    fn paint_writes_color_and_keeps_depth() {
        let mut host = SoftwareHost::new(Extent::new(4, 3));
        host.paint(|x, y| Vec4::new(x as f32, y as f32, 0.0, 1.0));
        assert_eq!(host.screen_pixel(3, 2), Vec4::new(3.0, 2.0, 0.0, 1.0));
        assert_eq!(host.screen_pixel(1, 0), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert!(is_background(host.texel(&host.screen_depth, 3, 2).x));
    }

    #[test]
    fn plot_respects_depth_test() {
        let mut host = SoftwareHost::new(Extent::new(2, 2));
        assert!(host.plot(1, 1, 0.5, Vec4::ONE));
        assert!(!host.plot(1, 1, 0.7, Vec4::X));
        assert!(host.plot(1, 1, 0.2, Vec4::Y));
        assert_eq!(host.screen_pixel(1, 1), Vec4::Y);
        assert!(!host.plot(5, 0, 0.1, Vec4::Y));
    }

    #[test]
    fn sphere_lands_at_its_distance() {
        let mut host = SoftwareHost::new(Extent::new(64, 64));
        host.translate(Vec3::new(0.0, 0.0, -200.0));
        host.draw_sphere(20.0, Vec4::ONE);
        assert!((host.screen_distance(32, 32) - 180.0).abs() < 1.0);
        assert_eq!(host.screen_pixel(0, 0), Vec4::ZERO);
        assert!(host.screen_pixel(32, 32).x > AMBIENT);
    }

    #[test]
    fn billboard_covers_its_footprint() {
        let mut host = SoftwareHost::new(Extent::new(64, 64));
        host.translate(Vec3::new(0.0, 0.0, -100.0));
        host.draw_billboard(Vec2::splat(10.0), |_| Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(host.screen_pixel(32, 32), Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert!((host.screen_distance(32, 32) - 100.0).abs() < 0.5);
        assert_eq!(host.screen_pixel(1, 1), Vec4::ZERO);
    }

    #[test]
    fn mismatched_uniforms_are_rejected() {
        let mut host = SoftwareHost::new(Extent::new(4, 4));
        let program = host.compile(Shader::FocalBlur).unwrap();
        let color = host.allocate(AttachmentKind::Color, Extent::new(4, 4)).unwrap();
        let depth = host.allocate(AttachmentKind::Depth, Extent::new(4, 4)).unwrap();
        let uniforms: ContactShadowUniforms = bytemuck::Zeroable::zeroed();
        let err = host
            .fullscreen_pass(
                &program,
                PassInputs { color: &color, depth: &depth },
                &PassUniforms::ContactShadow(uniforms),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            EffectError::InvalidState(InvalidState::ProgramMismatch { .. })
        ));
    }

    #[test]
    fn fullscreen_pass_writes_active_output() {
        let mut host = SoftwareHost::new(Extent::new(4, 4));
        let program = host.compile(Shader::FocalBlur).unwrap();
        let color = host.allocate(AttachmentKind::Color, Extent::new(4, 4)).unwrap();
        let depth = host.allocate(AttachmentKind::Depth, Extent::new(4, 4)).unwrap();
        let previous = host.bind_output(Output::Attachments {
            color: color.clone(),
            depth: depth.clone(),
        });
        host.clear(Vec4::new(0.1, 0.2, 0.3, 1.0));
        let _ = host.bind_output(previous);

        let uniforms = FocalBlurUniforms {
            screen_size: [4.0, 4.0],
            near: 1.0,
            far: 2000.0,
            focus_distance: 2000.0,
            intensity: 0.0,
            sample_count: 4,
            seed: 0,
        };
        host.fullscreen_pass(
            &program,
            PassInputs { color: &color, depth: &depth },
            &PassUniforms::FocalBlur(uniforms),
        )
        .unwrap();
        assert_eq!(host.screen_pixel(3, 3), Vec4::new(0.1, 0.2, 0.3, 1.0));
    }
}
