//! Sample patterns shared by both passes (`modules/sampling.wgsl`).

use std::f32::consts::TAU;

use glam::Vec2;

/// π(3 − √5), the angular step of a Vogel spiral.
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// PCG output permutation, identical to the WGSL `pcg_hash`.
#[must_use]
pub fn pcg_hash(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word =
        ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Per-pixel disk rotation in `[0, 2π)` for a given jitter seed.
#[must_use]
pub fn pixel_rotation(x: u32, y: u32, seed: u32) -> f32 {
    let h = pcg_hash(x ^ pcg_hash(y ^ pcg_hash(seed)));
    h as f32 / u32::MAX as f32 * TAU
}

/// Point `index` of a `count`-point Vogel disk of unit radius.
///
/// Points are area-uniform: the `i`-th sits at radius `sqrt((i + 0.5) / n)`.
#[must_use]
pub fn vogel_disk(index: u32, count: u32, rotation: f32) -> Vec2 {
    let r = ((index as f32 + 0.5) / count.max(1) as f32).sqrt();
    let theta = index as f32 * GOLDEN_ANGLE + rotation;
    Vec2::new(theta.cos(), theta.sin()) * r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vogel_points_stay_inside_unit_disk() {
        for count in [1, 7, 15, 64] {
            for i in 0..count {
                let p = vogel_disk(i, count, 1.3);
                assert!(p.length() <= 1.0 + 1e-6);
            }
        }
    }

    #[test]
    fn vogel_radii_grow_with_index() {
        let a = vogel_disk(0, 16, 0.0).length();
        let b = vogel_disk(15, 16, 0.0).length();
        assert!(a < b);
    }

    #[test]
    fn rotation_depends_on_seed_and_pixel() {
        let base = pixel_rotation(10, 20, 0);
        assert!((0.0..TAU + 1e-4).contains(&base));
        assert_ne!(base, pixel_rotation(10, 20, 1));
        assert_ne!(base, pixel_rotation(11, 20, 0));
        assert_eq!(base, pixel_rotation(10, 20, 0));
    }
}
