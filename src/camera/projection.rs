use glam::{Mat4, Vec3};

/// Convert a `[0, 1]` depth-buffer value into positive view-space distance.
///
/// Inverse of [`Projection::ndc_depth`] for a `perspective_rh` projection:
/// depth 0 maps to `znear`, depth 1 to `zfar`.
#[inline]
#[must_use]
pub fn linearize_depth(depth: f32, znear: f32, zfar: f32) -> f32 {
    znear * zfar / (zfar - depth * (zfar - znear))
}

/// `true` for depth values on (or past) the far plane, i.e. nothing drawn.
#[inline]
#[must_use]
pub fn is_background(depth: f32) -> bool {
    depth >= 1.0
}

/// Perspective projection parameters.
///
/// Snapshotted from the host once per effect pass; depth linearization is
/// only valid against the projection the scene was drawn with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fovy: 60.0,
            aspect: 1.0,
            znear: 1.0,
            zfar: 2000.0,
        }
    }
}

impl Projection {
    /// Create a projection from a vertical FOV in degrees.
    #[must_use]
    pub fn perspective(fovy: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self {
            fovy,
            aspect,
            znear,
            zfar,
        }
    }

    /// Projection matrix.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        // perspective_rh already uses [0,1] depth range (wgpu/Vulkan
        // convention)
        Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        )
    }

    /// View-space distance for a stored depth value.
    #[must_use]
    pub fn linearize(&self, depth: f32) -> f32 {
        linearize_depth(depth, self.znear, self.zfar)
    }

    /// Depth-buffer value a surface at `distance` in front of the camera
    /// writes.
    #[must_use]
    pub fn ndc_depth(&self, distance: f32) -> f32 {
        self.zfar * (distance - self.znear)
            / ((self.zfar - self.znear) * distance)
    }

    /// Pixels per world unit at unit distance, horizontally, for an output
    /// `width` pixels wide.
    #[must_use]
    pub fn focal_length_px(&self, width: u32) -> f32 {
        self.matrix().x_axis.x * width as f32 * 0.5
    }

    /// Recover a view-space position from a pixel center and its depth.
    ///
    /// Pixel coordinates are top-down, matching texture rows.
    #[must_use]
    pub fn unproject(
        inverse: &Mat4,
        pixel_x: f32,
        pixel_y: f32,
        depth: f32,
        width: f32,
        height: f32,
    ) -> Vec3 {
        let ndc = Vec3::new(
            pixel_x / width * 2.0 - 1.0,
            1.0 - pixel_y / height * 2.0,
            depth,
        );
        inverse.project_point3(ndc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linearize_inverts_ndc_depth() {
        let proj = Projection::perspective(60.0, 1.5, 1.0, 2000.0);
        for distance in [1.0, 10.0, 100.0, 500.0, 1999.0] {
            let depth = proj.ndc_depth(distance);
            assert!((0.0..=1.0).contains(&depth));
            let back = proj.linearize(depth);
            assert!(
                (back - distance).abs() / distance < 1e-3,
                "{distance} -> {depth} -> {back}"
            );
        }
    }

    #[test]
    fn ndc_depth_matches_projection_matrix() {
        let proj = Projection::perspective(45.0, 1.0, 0.5, 800.0);
        let clip = proj.matrix() * glam::Vec4::new(3.0, -2.0, -250.0, 1.0);
        let expected = clip.z / clip.w;
        assert!((proj.ndc_depth(250.0) - expected).abs() < 1e-5);
    }

    #[test]
    fn near_and_far_planes_map_to_range_ends() {
        let proj = Projection::default();
        assert!(proj.ndc_depth(proj.znear).abs() < 1e-6);
        assert!((proj.ndc_depth(proj.zfar) - 1.0).abs() < 1e-6);
        assert!(is_background(1.0));
        assert!(!is_background(0.999));
    }

    #[test]
    fn unproject_recovers_view_position() {
        let proj = Projection::perspective(60.0, 2.0, 1.0, 1000.0);
        let (w, h) = (200.0, 100.0);
        let point = Vec3::new(12.0, -5.0, -140.0);
        let clip = proj.matrix() * point.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        let px = (ndc.x + 1.0) * 0.5 * w;
        let py = (1.0 - ndc.y) * 0.5 * h;
        let back = Projection::unproject(
            &proj.matrix().inverse(),
            px,
            py,
            ndc.z,
            w,
            h,
        );
        assert!((back - point).length() < 1e-2, "{back:?}");
    }

    #[test]
    fn focal_length_scales_lateral_offsets() {
        let proj = Projection::perspective(60.0, 1.0, 1.0, 1000.0);
        let f = proj.focal_length_px(400);
        // A 10-unit lateral offset at distance 100 spans f * 0.1 pixels.
        let clip_a = proj.matrix() * glam::Vec4::new(0.0, 0.0, -100.0, 1.0);
        let clip_b = proj.matrix() * glam::Vec4::new(10.0, 0.0, -100.0, 1.0);
        let dx = (clip_b.x / clip_b.w - clip_a.x / clip_a.w) * 0.5 * 400.0;
        assert!((dx - f * 0.1).abs() < 1e-3);
    }
}
