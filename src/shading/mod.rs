//! CPU mirror of the WGSL full-screen passes.
//!
//! Each function here follows its shader counterpart in
//! `assets/shaders/screen/` texel for texel: nearest-texel fetches, the same
//! Vogel-disk sample pattern and the same per-pixel hash. The software host
//! runs effects through these, and the effect-level tests use them to pin
//! down blur radii and occlusion values without a GPU.

pub mod contact_shadow;
pub mod focal_blur;
pub mod sampling;

use glam::Vec4;

use crate::host::Extent;

/// Borrowed, row-major view over a plane of texels.
///
/// Depth planes store their value in the `x` channel.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a> {
    extent: Extent,
    texels: &'a [Vec4],
}

impl<'a> ImageView<'a> {
    /// Wrap `texels`, which must hold exactly `extent.texel_count()` values.
    ///
    /// Returns `None` on a size mismatch.
    #[must_use]
    pub fn new(extent: Extent, texels: &'a [Vec4]) -> Option<Self> {
        (texels.len() == extent.texel_count()).then_some(Self { extent, texels })
    }

    /// Plane dimensions.
    #[must_use]
    pub const fn extent(&self) -> Extent {
        self.extent
    }

    /// Texel at `(x, y)`, or `None` outside the plane.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Vec4> {
        if x < 0
            || y < 0
            || x >= self.extent.width as i32
            || y >= self.extent.height as i32
        {
            return None;
        }
        Some(self.texels[y as usize * self.extent.width as usize + x as usize])
    }

    /// Texel at `(x, y)` with coordinates clamped to the edge.
    #[must_use]
    pub fn load_clamped(&self, x: i32, y: i32) -> Vec4 {
        let cx = x.clamp(0, self.extent.width as i32 - 1);
        let cy = y.clamp(0, self.extent.height as i32 - 1);
        self.texels[cy as usize * self.extent.width as usize + cx as usize]
    }

    /// Depth value at `(x, y)`, or `None` outside the plane.
    #[must_use]
    pub fn depth(&self, x: i32, y: i32) -> Option<f32> {
        self.get(x, y).map(|t| t.x)
    }
}
