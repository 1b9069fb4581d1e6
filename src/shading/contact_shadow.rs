//! Contact shadow (`screen/contact_shadow.wgsl`).
//!
//! Each pixel's view-space position `P` is rebuilt from depth. A Vogel disk
//! is scaled so its screen-space radius approximates `sample_reach` at
//! `P`'s depth (`r_px = sample_reach * focal_length_px / d_P`). Every disk
//! sample is rebuilt into `Q` at its exact screen position, using the depth
//! of the texel it falls in. A sample occludes when it lies within
//! `search_radius` of `P` and sits in front of `P` by more than `bias`,
//! contributing `1 - |Q - P| / search_radius`. The sum is averaged over the
//! sample count, scaled by intensity, and multiplied out of the color:
//! `color * (1 - occlusion)`.
//!
//! The sampled neighbours depend on `sample_reach` only. Growing
//! `search_radius` admits more of them and raises each weight, so occlusion
//! never decreases with it.

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::sampling::{pixel_rotation, vogel_disk};
use super::ImageView;
use crate::camera::projection::{is_background, Projection};
use crate::renderer::postprocess::uniforms::{
    clamp_samples, ContactShadowUniforms,
};

/// Samples closer than this to `P` are the pixel itself.
const SELF_DISTANCE: f32 = 1e-4;

fn view_position(
    inv_proj: &Mat4,
    pixel: Vec2,
    depth: f32,
    params: &ContactShadowUniforms,
) -> Vec3 {
    Projection::unproject(
        inv_proj,
        pixel.x,
        pixel.y,
        depth,
        params.screen_size[0],
        params.screen_size[1],
    )
}

/// Both radii must be positive; NaN counts as disabled.
fn is_enabled(params: &ContactShadowUniforms) -> bool {
    let positive = |v: f32| v > 0.0;
    positive(params.search_radius) && positive(params.sample_reach)
}

/// Normalized occlusion in `[0, 1]` at pixel `(x, y)`, before intensity.
///
/// Background pixels and a non-positive search radius or reach yield 0.
#[must_use]
pub fn occlusion(
    depth: &ImageView<'_>,
    x: u32,
    y: u32,
    params: &ContactShadowUniforms,
) -> f32 {
    let Some(stored) = depth.depth(x as i32, y as i32) else {
        return 0.0;
    };
    if is_background(stored) || !is_enabled(params) {
        return 0.0;
    }

    let inv_proj = Mat4::from_cols_array_2d(&params.inv_proj);
    let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
    let p = view_position(&inv_proj, center, stored, params);
    let p_distance = -p.z;
    let radius_px = params.sample_reach * params.focal_length_px / p_distance;

    let count = clamp_samples(params.sample_count);
    let rotation = pixel_rotation(x, y, params.seed);
    let mut sum = 0.0;
    for i in 0..count {
        let s = center + vogel_disk(i, count, rotation) * radius_px;
        let (sx, sy) = (s.x.floor() as i32, s.y.floor() as i32);
        let Some(sample_depth) = depth.depth(sx, sy) else {
            continue;
        };
        if is_background(sample_depth) {
            continue;
        }
        let q = view_position(&inv_proj, s, sample_depth, params);
        let dist = q.distance(p);
        if dist <= SELF_DISTANCE || dist >= params.search_radius {
            continue;
        }
        // How far the neighbour sits in front of P along the view axis.
        let lead = p_distance + q.z;
        if lead <= params.bias {
            continue;
        }
        sum += 1.0 - dist / params.search_radius;
    }
    sum / count as f32
}

/// Shade a single output pixel.
#[must_use]
pub fn shade_pixel(
    color: &ImageView<'_>,
    depth: &ImageView<'_>,
    x: u32,
    y: u32,
    params: &ContactShadowUniforms,
) -> Vec4 {
    let base = color.load_clamped(x as i32, y as i32);
    let darken =
        (params.intensity * occlusion(depth, x, y, params)).clamp(0.0, 1.0);
    (base.truncate() * (1.0 - darken)).extend(base.w)
}

/// Run the pass over every pixel of `color`.
#[must_use]
pub fn render(
    color: &ImageView<'_>,
    depth: &ImageView<'_>,
    params: &ContactShadowUniforms,
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
