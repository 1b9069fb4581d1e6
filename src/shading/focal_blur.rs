//! Focal blur (`screen/focal_blur.wgsl`).
//!
//! Blur radius grows linearly with the distance between a pixel's linear
//! depth and the focal distance: `r = intensity * |d_pixel - d_focus|`,
//! in pixels. The pixel's color becomes the uniform average of
//! `sample_count` nearest-texel fetches on a jittered Vogel disk of radius
//! `r`. Below half a pixel every fetch would land on the center texel, so
//! the pixel passes through unchanged.

use glam::{Vec2, Vec4};

use super::sampling::{pixel_rotation, vogel_disk};
use super::ImageView;
use crate::camera::projection::linearize_depth;
use crate::renderer::postprocess::uniforms::{clamp_samples, FocalBlurUniforms};

/// Radius below which the disk cannot leave the center texel.
pub const MIN_BLUR_RADIUS: f32 = 0.5;

/// Blur radius in pixels for a stored depth value.
#[must_use]
pub fn blur_radius(depth: f32, params: &FocalBlurUniforms) -> f32 {
    let distance = linearize_depth(depth, params.near, params.far);
    params.intensity * (distance - params.focus_distance).abs()
}

/// Shade a single output pixel.
#[must_use]
pub fn shade_pixel(
    color: &ImageView<'_>,
    depth: &ImageView<'_>,
    x: u32,
    y: u32,
    params: &FocalBlurUniforms,
) -> Vec4 {
    let (ix, iy) = (x as i32, y as i32);
    let stored = depth.depth(ix, iy).unwrap_or(1.0);
    let radius = blur_radius(stored, params);
    // Zero and negative intensities land here too.
    if radius.is_nan() || radius < MIN_BLUR_RADIUS {
        return color.load_clamped(ix, iy);
    }

    let count = clamp_samples(params.sample_count);
    let rotation = pixel_rotation(x, y, params.seed);
    let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
    let mut sum = Vec4::ZERO;
    for i in 0..count {
        let p = center + vogel_disk(i, count, rotation) * radius;
        sum += color.load_clamped(p.x.floor() as i32, p.y.floor() as i32);
    }
    sum / count as f32
}

/// Run the pass over every pixel of `color`.
#[must_use]
pub fn render(
    color: &ImageView<'_>,
    depth: &ImageView<'_>,
    params: &FocalBlurUniforms,
) -> Vec<Vec4> {
    let extent = color.extent();
    let mut out = Vec::with_capacity(extent.texel_count());
    for y in 0..extent.height {
        for x in 0..extent.width {
            out.push(shade_pixel(color, depth, x, y, params));
        }
    }
    out
}
